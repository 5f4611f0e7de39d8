use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::model::{AddressBook, FieldError, FieldKey, Person};

pub mod atomic;
pub mod loader;
pub mod overwrite;
pub mod raw;
pub mod report;

pub use atomic::write_atomic;
pub use raw::{RawPerson, RawProperty, SerializableAddressBook};
pub use report::{InvalidEntry, LoadReport, LoadSummary, DUPLICATE_REASON};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path} is not a valid address book file: {reason}")]
    Structural { path: String, reason: String },
    #[error("index {index} is out of range for {len} person records")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("property at index {index} is invalid: {source}")]
    InvalidProperty {
        index: usize,
        #[source]
        source: FieldError,
    },
    #[error("property at index {index} duplicates an earlier property named {name}")]
    DuplicateProperty { index: usize, name: String },
    #[error("serialize address book: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn structural(path: &Path, reason: impl Into<String>) -> Self {
        StorageError::Structural {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// The JSON file holding the `persons` and `properties` arrays.
#[derive(Debug, Clone)]
pub struct JsonAddressBookStorage {
    path: PathBuf,
}

impl JsonAddressBookStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file and partitions its persons into valid and quarantined.
    pub fn load_report(&self) -> Result<LoadReport, StorageError> {
        loader::load_report(&self.path)
    }

    /// Replaces the person element at `index` and reloads.
    pub fn overwrite_person(
        &self,
        index: usize,
        person: &Person,
    ) -> Result<LoadReport, StorageError> {
        overwrite::overwrite_person(&self.path, index, person)
    }

    /// Rewrites only `fields` of the person element at `index` and reloads.
    pub fn patch_person(
        &self,
        index: usize,
        record: &RawPerson,
        fields: &BTreeSet<FieldKey>,
    ) -> Result<LoadReport, StorageError> {
        overwrite::patch_person(&self.path, index, record, fields)
    }

    /// Writes the whole book. Quarantined entries are not part of `book`, so
    /// callers must not use this while the file still has any.
    pub fn save_address_book(&self, book: &AddressBook) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| StorageError::io(parent, err))?;
        }
        let payload = serde_json::to_vec_pretty(&SerializableAddressBook::from(book))?;
        write_atomic(&self.path, &payload).map_err(|err| StorageError::io(&self.path, err))?;
        info!(
            target: "propbook",
            event = "address_book_saved",
            path = %self.path.display(),
            persons = book.persons().len(),
            properties = book.properties().len()
        );
        Ok(())
    }

    /// Startup load: any hard failure degrades to an empty book with a warning.
    pub fn load_or_default(&self) -> LoadReport {
        match self.load_report() {
            Ok(report) => {
                if report.has_invalid() {
                    warn!(
                        target: "propbook",
                        event = "invalid_persons_found",
                        count = report.invalid_entries().len(),
                        path = %self.path.display()
                    );
                }
                report
            }
            Err(err) => {
                warn!(
                    target: "propbook",
                    event = "address_book_load_failed",
                    error = %err,
                    path = %self.path.display(),
                    "starting with an empty address book"
                );
                LoadReport::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_or_default_falls_back_on_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("addressbook.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let storage = JsonAddressBookStorage::new(&path);

        assert!(matches!(
            storage.load_report(),
            Err(StorageError::Structural { .. })
        ));
        let report = storage.load_or_default();
        assert!(report.address_book().is_empty());
        assert!(!report.has_invalid());
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("addressbook.json");
        let storage = JsonAddressBookStorage::new(&path);
        storage.save_address_book(&AddressBook::new()).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({"persons": [], "properties": []}));
    }
}
