//! Path normalization.

use std::path::{Component, Path, PathBuf};

/// Makes `path` absolute against the current directory and removes `.` and
/// `..` components lexically.
///
/// The path does not need to exist and symlinks are not resolved, so two
/// spellings of the same location compare equal as long as they agree
/// lexically.
#[must_use]
pub fn absolutize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_kept() {
        assert_eq!(absolutize("/archive/smith"), PathBuf::from("/archive/smith"));
    }

    #[test]
    fn test_dot_segments_removed() {
        assert_eq!(
            absolutize("/archive/./smith/../jones/config.json"),
            PathBuf::from("/archive/jones/config.json")
        );
    }

    #[test]
    fn test_relative_joined_to_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize("smith"), cwd.join("smith"));
    }
}
