//! The persisted batch catalogue.

use super::identity::generate_batch_id;
use super::{BatchRecord, BatchSummary};
use crate::config::{write_atomically, BatchConfig, ConfigManager, Settings};
use crate::context::BatchPaths;
use crate::core::BatchStatus;
use crate::errors::{ConfigError, RegistryError};
use crate::utils::{absolutize, now_utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    batches: BTreeMap<String, BatchRecord>,
}

/// Catalogue of every batch this installation knows about.
///
/// The whole document is read once when the registry is opened and
/// rewritten in full on every change. A change becomes visible in memory
/// only after it has been written. There is no locking: two processes
/// mutating the same registry file overwrite each other's changes.
///
/// Unregistering a batch removes only its catalogue entry; the batch's
/// files are never touched.
#[derive(Debug)]
pub struct BatchRegistry {
    path: PathBuf,
    total_steps: u32,
    document: RegistryDocument,
}

impl BatchRegistry {
    /// Opens the registry at `path`.
    ///
    /// A missing file is an empty registry. An unreadable or corrupt file is
    /// logged and also treated as empty; it is replaced on the next write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, total_steps: u32) -> Self {
        let path = path.into();
        let document = load_document(&path);
        debug!(
            path = %path.display(),
            batches = document.batches.len(),
            "Opened batch registry"
        );
        Self {
            path,
            total_steps,
            document,
        }
    }

    /// Opens the registry named by `settings`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::open(&settings.registry_path, settings.total_steps)
    }

    /// Re-reads the document from disk, dropping the in-memory copy.
    pub fn reload(&mut self) {
        self.document = load_document(&self.path);
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the step count used for summaries.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Returns the number of registered batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.document.batches.len()
    }

    /// Returns true if no batches are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document.batches.is_empty()
    }

    /// Registers a batch and returns its new identity.
    ///
    /// The identity is derived from `name` and made unique with a numeric
    /// suffix. Both paths are stored in absolute form. Nothing on disk
    /// besides the registry document is created or checked.
    pub fn register_batch(
        &mut self,
        name: &str,
        data_directory: impl AsRef<Path>,
        config_path: impl AsRef<Path>,
    ) -> Result<String, RegistryError> {
        let id = generate_batch_id(name, |candidate| {
            self.document.batches.contains_key(candidate)
        });
        let now = now_utc();
        let record = BatchRecord {
            id: id.clone(),
            name: name.to_string(),
            data_directory: absolutize(data_directory),
            config_path: absolutize(config_path),
            created: now,
            last_accessed: now,
            status: BatchStatus::Active,
        };

        self.update(|document| {
            document.batches.insert(id.clone(), record);
        })?;
        info!(batch_id = %id, name = %name, "Registered batch");
        Ok(id)
    }

    /// Lays out a new batch on disk and registers it.
    ///
    /// Creates the standard directory tree under `data_directory` and a
    /// config with every step incomplete. An existing config is kept, so
    /// re-creating a batch never discards its progress.
    pub fn create_batch(
        &mut self,
        name: &str,
        data_directory: impl AsRef<Path>,
    ) -> Result<String, RegistryError> {
        let paths = BatchPaths::new(data_directory);
        let setup_error = |source: ConfigError| RegistryError::Setup {
            name: name.to_string(),
            source,
        };

        paths.ensure_layout().map_err(|source| {
            setup_error(ConfigError::WriteFile {
                path: paths.root().to_path_buf(),
                source,
            })
        })?;

        if paths.config_file().exists() {
            debug!(path = %paths.config_file().display(), "Keeping existing batch config");
        } else {
            ConfigManager::create(paths.config_file(), name, self.total_steps)
                .map_err(setup_error)?;
        }

        self.register_batch(name, paths.root(), paths.config_file())
    }

    /// Removes a batch's entry. Its files are left in place.
    pub fn unregister_batch(&mut self, batch_id: &str) -> Result<(), RegistryError> {
        self.require(batch_id)?;
        self.update(|document| {
            document.batches.remove(batch_id);
        })?;
        info!(batch_id = %batch_id, "Unregistered batch");
        Ok(())
    }

    /// Overwrites a batch's status. Any status may follow any other.
    pub fn update_batch_status(
        &mut self,
        batch_id: &str,
        status: BatchStatus,
    ) -> Result<(), RegistryError> {
        let previous = self.require(batch_id)?.status;
        self.update(|document| {
            if let Some(record) = document.batches.get_mut(batch_id) {
                record.status = status;
            }
        })?;
        info!(batch_id = %batch_id, from = %previous, to = %status, "Updated batch status");
        Ok(())
    }

    /// Stamps a batch's last-accessed time with the current time.
    pub fn update_last_accessed(&mut self, batch_id: &str) -> Result<(), RegistryError> {
        self.require(batch_id)?;
        let now = now_utc();
        self.update(|document| {
            if let Some(record) = document.batches.get_mut(batch_id) {
                record.last_accessed = now;
            }
        })
    }

    /// Returns a batch by identity.
    #[must_use]
    pub fn get_batch(&self, batch_id: &str) -> Option<&BatchRecord> {
        self.document.batches.get(batch_id)
    }

    /// Returns every batch, ordered by identity.
    #[must_use]
    pub fn get_all_batches(&self) -> Vec<&BatchRecord> {
        self.document.batches.values().collect()
    }

    /// Returns batches whose status is `active`.
    #[must_use]
    pub fn get_active_batches(&self) -> Vec<&BatchRecord> {
        self.document
            .batches
            .values()
            .filter(|record| record.status.is_active())
            .collect()
    }

    /// Returns the first batch with this display name.
    #[must_use]
    pub fn find_batch_by_name(&self, name: &str) -> Option<&BatchRecord> {
        self.document
            .batches
            .values()
            .find(|record| record.name == name)
    }

    /// Returns the batch whose config file is `config_path`.
    ///
    /// Paths are compared in absolute form.
    #[must_use]
    pub fn find_batch_by_config(&self, config_path: impl AsRef<Path>) -> Option<&BatchRecord> {
        let wanted = absolutize(config_path);
        self.document
            .batches
            .values()
            .find(|record| absolutize(&record.config_path) == wanted)
    }

    /// Returns a batch's entry merged with its progress.
    ///
    /// A missing or unreadable batch config counts as no progress.
    #[must_use]
    pub fn get_batch_summary(&self, batch_id: &str) -> Option<BatchSummary> {
        self.get_batch(batch_id).map(|record| self.summarize(record))
    }

    /// Returns every batch's summary, most recently accessed first.
    #[must_use]
    pub fn list_batches_summary(&self) -> Vec<BatchSummary> {
        let mut summaries: Vec<BatchSummary> = self
            .document
            .batches
            .values()
            .map(|record| self.summarize(record))
            .collect();
        summaries.sort_by(|a, b| b.record.last_accessed.cmp(&a.record.last_accessed));
        summaries
    }

    fn summarize(&self, record: &BatchRecord) -> BatchSummary {
        let total_steps = self.total_steps;
        let (completed, next_step) = match BatchConfig::read(&record.config_path) {
            Ok(config) => (
                config.completed_count(total_steps),
                config.first_incomplete(total_steps),
            ),
            Err(err) => {
                warn!(
                    batch_id = %record.id,
                    error = %err,
                    "Batch config unavailable; reporting no progress"
                );
                (0, (total_steps > 0).then_some(1))
            }
        };
        BatchSummary::new(record.clone(), completed, total_steps, next_step)
    }

    fn require(&self, batch_id: &str) -> Result<&BatchRecord, RegistryError> {
        self.get_batch(batch_id)
            .ok_or_else(|| RegistryError::NotFound(batch_id.to_string()))
    }

    fn update<F: FnOnce(&mut RegistryDocument)>(&mut self, apply: F) -> Result<(), RegistryError> {
        let mut next = self.document.clone();
        apply(&mut next);
        self.persist(&next)?;
        self.document = next;
        Ok(())
    }

    fn persist(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        write_atomically(&self.path, &bytes).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "Failed to write batch registry");
            RegistryError::Persist {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn load_document(path: &Path) -> RegistryDocument {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No batch registry yet; starting empty");
            return RegistryDocument::default();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Could not read batch registry; starting empty");
            return RegistryDocument::default();
        }
    };

    match serde_json::from_str::<RegistryDocument>(&raw) {
        Ok(mut document) => {
            for (id, record) in &mut document.batches {
                record.id.clone_from(id);
            }
            document
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Batch registry is corrupt; starting empty");
            RegistryDocument::default()
        }
    }
}
