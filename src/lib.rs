//! Contact and property book backed by a single JSON file.
//!
//! Loading never fails because of a bad person record: such records are
//! quarantined in a [`LoadReport`] and can be repaired one at a time in place.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod repair;
pub mod storage;

pub use error::{AppError, AppResult};
pub use storage::{InvalidEntry, JsonAddressBookStorage, LoadReport, StorageError};

/// Stderr logging for binaries and tests that have no data directory.
pub fn init_logging() {
    logging::init_stderr();
}
