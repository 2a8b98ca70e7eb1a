//! Utility functions for timestamps and filesystem paths.
//!
//! Timestamps are written as ISO 8601 strings and read back leniently, so
//! registry files produced by older tools (naive local-time stamps) still
//! load.

pub mod paths;
pub mod timestamps;

pub use paths::absolutize;
pub use timestamps::{format_iso8601, iso_timestamp, now_utc, parse_timestamp, Timestamp};
