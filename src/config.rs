use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Overrides the data directory; used by tests and portable installs.
pub const DATA_DIR_ENV: &str = "PROPBOOK_DATA_DIR";
pub const PREFERENCES_FILE: &str = "preferences.json";
const APP_DIR_NAME: &str = "propbook";
const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPrefs {
    /// Relative paths resolve against the data directory.
    pub address_book_file_path: PathBuf,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            address_book_file_path: PathBuf::from("data").join("addressbook.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    base_dir: PathBuf,
}

impl AppPaths {
    pub fn resolve() -> anyhow::Result<Self> {
        if let Ok(fake) = std::env::var(DATA_DIR_ENV) {
            return Ok(Self::at(fake));
        }

        let base = dirs::data_dir()
            .or_else(|| std::env::current_dir().ok())
            .context("failed to resolve application data directory")?;
        Ok(Self::at(base.join(APP_DIR_NAME)))
    }

    pub fn at(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join(LOGS_DIR_NAME)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.base_dir.join(PREFERENCES_FILE)
    }

    /// Missing preferences are the defaults; unreadable ones are the defaults with a warning.
    pub fn load_prefs(&self) -> UserPrefs {
        let path = self.preferences_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return UserPrefs::default(),
            Err(err) => {
                warn!(
                    target: "propbook",
                    event = "prefs_read_failed",
                    path = %path.display(),
                    error = %err
                );
                return UserPrefs::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!(
                target: "propbook",
                event = "prefs_malformed",
                path = %path.display(),
                error = %err
            );
            UserPrefs::default()
        })
    }

    pub fn address_book_path(&self, prefs: &UserPrefs) -> PathBuf {
        if prefs.address_book_file_path.is_absolute() {
            prefs.address_book_file_path.clone()
        } else {
            self.base_dir.join(&prefs.address_book_file_path)
        }
    }
}
