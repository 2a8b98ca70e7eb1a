//! Per-run key/value scratch space.

use crate::errors::ContextError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Values one step computes for a later step in the same run.
///
/// The scratch space is cleared at the start of every pipeline run and is
/// never written to disk. Anything that must survive a restart belongs in
/// the batch config or in files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScratchSpace {
    data: HashMap<String, serde_json::Value>,
}

impl ScratchSpace {
    /// Creates an empty scratch space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a value decoded into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        self.data
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|err| ContextError::Decode {
                    key: key.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Sets a value, returning any previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.data.insert(key.into(), value)
    }

    /// Sets a value only if the key is free.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::KeyConflict` if the key already exists.
    pub fn try_insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), ContextError> {
        let key = key.into();
        if self.data.contains_key(&key) {
            return Err(ContextError::KeyConflict(key));
        }
        self.data.insert(key, value);
        Ok(())
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the scratch space is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut scratch = ScratchSpace::new();
        assert!(scratch.is_empty());

        assert!(scratch.insert("row_count", serde_json::json!(42)).is_none());
        let previous = scratch.insert("row_count", serde_json::json!(43));

        assert_eq!(previous, Some(serde_json::json!(42)));
        assert_eq!(scratch.get("row_count"), Some(&serde_json::json!(43)));
        assert_eq!(scratch.len(), 1);
    }

    #[test]
    fn test_try_insert_conflict() {
        let mut scratch = ScratchSpace::new();
        scratch.try_insert("tagged", serde_json::json!(true)).unwrap();

        let err = scratch.try_insert("tagged", serde_json::json!(false)).unwrap_err();
        assert_eq!(err, ContextError::KeyConflict("tagged".to_string()));
        assert_eq!(scratch.get("tagged"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_get_as() {
        let mut scratch = ScratchSpace::new();
        scratch.insert("files", serde_json::json!(["a.tif", "b.tif"]));

        let files: Option<Vec<String>> = scratch.get_as("files").unwrap();
        assert_eq!(files, Some(vec!["a.tif".to_string(), "b.tif".to_string()]));

        let missing: Option<u32> = scratch.get_as("missing").unwrap();
        assert!(missing.is_none());

        assert!(matches!(
            scratch.get_as::<u32>("files"),
            Err(ContextError::Decode { .. })
        ));
    }

    #[test]
    fn test_remove_clear_keys() {
        let mut scratch = ScratchSpace::new();
        scratch.insert("b", serde_json::json!(2));
        scratch.insert("a", serde_json::json!(1));
        assert_eq!(scratch.keys(), vec!["a", "b"]);

        assert_eq!(scratch.remove("a"), Some(serde_json::json!(1)));
        scratch.clear();
        assert!(scratch.is_empty());
    }
}
