//! Guided, one-record-at-a-time repair of quarantined persons.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::AppError;
use crate::model::FieldKey;
use crate::storage::{InvalidEntry, JsonAddressBookStorage, LoadReport, RawPerson, StorageError};

mod prompt;

pub use prompt::TerminalPrompt;

/// Replacement text per flagged field. List fields take comma-separated values.
pub type FieldCorrections = BTreeMap<FieldKey, String>;

/// Supplies corrected values for a quarantined entry.
pub trait RepairPrompt {
    /// Values for `entry.invalid_fields`. Values for other fields are ignored.
    /// `last_error` describes why the previous attempt on this entry failed.
    /// Returning `None` cancels the session.
    fn request_corrections(
        &mut self,
        entry: &InvalidEntry,
        last_error: Option<&str>,
    ) -> Option<FieldCorrections>;
}

impl<F> RepairPrompt for F
where
    F: FnMut(&InvalidEntry, Option<&str>) -> Option<FieldCorrections>,
{
    fn request_corrections(
        &mut self,
        entry: &InvalidEntry,
        last_error: Option<&str>,
    ) -> Option<FieldCorrections> {
        self(entry, last_error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepairState {
    AwaitingNextInvalid,
    AwaitingUserInput {
        entry: InvalidEntry,
        last_error: Option<String>,
    },
    Applying {
        entry: InvalidEntry,
        merged: RawPerson,
    },
    Done(LoadReport),
    Cancelled,
}

impl RepairState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RepairState::Done(_) | RepairState::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    /// No repairable entries remain. Duplicates may still be listed in the report.
    Done { report: LoadReport, repaired: usize },
    /// The prompt declined; the caller must not continue into the main app.
    Cancelled { repaired: usize },
}

/// Drives the repair loop. Indices are only trusted for the report they came
/// from, so the file is reloaded before every entry is picked.
pub struct RepairSession<'a, P> {
    storage: &'a JsonAddressBookStorage,
    prompt: P,
    state: RepairState,
    repaired: usize,
}

impl<'a, P: RepairPrompt> RepairSession<'a, P> {
    pub fn new(storage: &'a JsonAddressBookStorage, prompt: P) -> Self {
        Self {
            storage,
            prompt,
            state: RepairState::AwaitingNextInvalid,
            repaired: 0,
        }
    }

    pub fn state(&self) -> &RepairState {
        &self.state
    }

    pub fn repaired(&self) -> usize {
        self.repaired
    }

    /// Performs one transition. Only a failed reload is returned as an error;
    /// failed applies go back to the prompt.
    pub fn step(&mut self) -> Result<(), StorageError> {
        let current = std::mem::replace(&mut self.state, RepairState::Cancelled);
        self.state = match current {
            RepairState::AwaitingNextInvalid => {
                let report = match self.storage.load_report() {
                    Ok(report) => report,
                    Err(err) => {
                        self.state = RepairState::AwaitingNextInvalid;
                        return Err(err);
                    }
                };
                match report.next_repairable() {
                    Some(entry) => RepairState::AwaitingUserInput {
                        entry: entry.clone(),
                        last_error: None,
                    },
                    None => RepairState::Done(report),
                }
            }
            RepairState::AwaitingUserInput { entry, last_error } => {
                match self.prompt.request_corrections(&entry, last_error.as_deref()) {
                    Some(corrections) => {
                        let merged = entry
                            .raw
                            .merge_corrections(&entry.invalid_fields, &corrections);
                        RepairState::Applying { entry, merged }
                    }
                    None => {
                        info!(
                            target: "propbook",
                            event = "repair_cancelled",
                            index = entry.index,
                            repaired = self.repaired
                        );
                        RepairState::Cancelled
                    }
                }
            }
            RepairState::Applying { entry, merged } => match self.apply(&entry, &merged) {
                Ok(()) => {
                    self.repaired += 1;
                    RepairState::AwaitingNextInvalid
                }
                Err(err) => {
                    warn!(
                        target: "propbook",
                        event = "repair_apply_failed",
                        index = entry.index,
                        code = err.code(),
                        error = %err
                    );
                    RepairState::AwaitingUserInput {
                        entry,
                        last_error: Some(err.message().to_string()),
                    }
                }
            },
            terminal @ (RepairState::Done(_) | RepairState::Cancelled) => terminal,
        };
        Ok(())
    }

    fn apply(&self, entry: &InvalidEntry, merged: &RawPerson) -> Result<(), AppError> {
        // Validation only; the stored text is the merged raw text.
        merged.to_model()?;
        self.storage
            .patch_person(entry.index, merged, &entry.invalid_fields)?;
        info!(
            target: "propbook",
            event = "repair_applied",
            index = entry.index,
            fields = ?entry.invalid_fields
        );
        Ok(())
    }

    /// Steps until `Done` or `Cancelled`.
    pub fn run(mut self) -> Result<RepairOutcome, StorageError> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(match self.state {
            RepairState::Done(report) => RepairOutcome::Done {
                report,
                repaired: self.repaired,
            },
            _ => RepairOutcome::Cancelled {
                repaired: self.repaired,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn storage_with(persons: serde_json::Value) -> (tempfile::TempDir, JsonAddressBookStorage) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("addressbook.json");
        let doc = serde_json::json!({"persons": persons, "properties": []});
        std::fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
        (dir, JsonAddressBookStorage::new(path))
    }

    #[test]
    fn walks_through_the_states() {
        let (_dir, storage) = storage_with(serde_json::json!([
            {"name": "Alice", "phone": "9", "email": "a@b.com", "address": "x"}
        ]));
        let prompt = |_: &InvalidEntry, _: Option<&str>| {
            Some(FieldCorrections::from([(FieldKey::Phone, "91234567".to_string())]))
        };
        let mut session = RepairSession::new(&storage, prompt);

        session.step().unwrap();
        assert!(matches!(
            session.state(),
            RepairState::AwaitingUserInput { entry, .. } if entry.index == 0
        ));
        session.step().unwrap();
        assert!(matches!(
            session.state(),
            RepairState::Applying { merged, .. } if merged.phone.as_deref() == Some("91234567")
        ));
        session.step().unwrap();
        assert_eq!(session.state(), &RepairState::AwaitingNextInvalid);
        session.step().unwrap();
        assert!(matches!(session.state(), RepairState::Done(report) if !report.has_invalid()));
        assert_eq!(session.repaired(), 1);
    }

    #[test]
    fn failed_apply_asks_again_with_the_error() {
        let (_dir, storage) = storage_with(serde_json::json!([
            {"name": "Alice", "phone": "9", "email": "a@b.com", "address": "x"}
        ]));
        let mut seen_errors = Vec::new();
        let prompt = |_: &InvalidEntry, last_error: Option<&str>| {
            seen_errors.push(last_error.map(str::to_string));
            let phone = if seen_errors.len() == 1 { "12" } else { "912" };
            Some(FieldCorrections::from([(FieldKey::Phone, phone.to_string())]))
        };
        let outcome = RepairSession::new(&storage, prompt).run().unwrap();

        assert!(matches!(outcome, RepairOutcome::Done { repaired: 1, .. }));
        assert_eq!(seen_errors.len(), 2);
        assert_eq!(seen_errors[0], None);
        assert!(seen_errors[1].as_deref().is_some_and(|e| e.contains("Phone numbers")));
    }

    #[test]
    fn declining_cancels() {
        let (_dir, storage) = storage_with(serde_json::json!([{"name": ""}]));
        let before = std::fs::read(storage.path()).unwrap();
        let outcome = RepairSession::new(&storage, |_: &InvalidEntry, _: Option<&str>| None)
            .run()
            .unwrap();
        assert_eq!(outcome, RepairOutcome::Cancelled { repaired: 0 });
        assert_eq!(std::fs::read(storage.path()).unwrap(), before);
    }
}
