//! Batch identity generation.

use regex::Regex;
use std::sync::LazyLock;

const FALLBACK_ID: &str = "batch";

static SEPARATOR_RUNS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[\s_-]+")
        .map_err(|err| tracing::error!("Failed to compile separator regex: {}", err))
        .ok()
});

/// Turns a display name into an identity slug.
///
/// Lower-cases the name, drops punctuation, and collapses runs of
/// whitespace, hyphens, and underscores into a single `_`. A name with
/// nothing usable left becomes `"batch"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    let joined = match SEPARATOR_RUNS.as_ref() {
        Some(separators) => separators.replace_all(&kept, "_").into_owned(),
        None => kept
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_"),
    };

    let slug = joined.trim_matches('_');
    if slug.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        slug.to_string()
    }
}

/// Generates an identity for `name` that `taken` does not report as used.
///
/// Collisions are resolved by appending `_1`, `_2`, ... to the slug.
#[must_use]
pub fn generate_batch_id(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = slugify(name);
    if !taken(&base) {
        return base;
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
