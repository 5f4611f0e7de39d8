use tracing::info;

use crate::error::{AppError, AppResult};
use crate::repair::FieldCorrections;
use crate::storage::{JsonAddressBookStorage, LoadReport, StorageError};

pub const NOT_QUARANTINED_CODE: &str = "REPAIR/NOT_QUARANTINED";

/// Repairs one quarantined person by its 1-based position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixCommand {
    display_index: i64,
    corrections: FieldCorrections,
}

impl FixCommand {
    pub fn new(display_index: i64, corrections: FieldCorrections) -> Self {
        Self {
            display_index,
            corrections,
        }
    }

    /// Applies the corrections to the entry's flagged fields and overwrites it.
    /// Returns the report reloaded after the write.
    pub fn execute(&self, storage: &JsonAddressBookStorage) -> AppResult<LoadReport> {
        let report = storage.load_report()?;
        let len = report.total_persons();
        let requested = self.display_index.saturating_sub(1);
        let index = usize::try_from(requested)
            .ok()
            .filter(|index| *index < len)
            .ok_or(StorageError::IndexOutOfRange {
                index: requested,
                len,
            })?;

        let entry = report
            .entry_at(index)
            .filter(|entry| !entry.is_duplicate())
            .ok_or_else(|| {
                AppError::new(
                    NOT_QUARANTINED_CODE,
                    format!("Record #{} has no invalid fields to fix", self.display_index),
                )
                .with_context("index", index.to_string())
            })?;

        let merged = entry
            .raw
            .merge_corrections(&entry.invalid_fields, &self.corrections);
        // Validation only; the stored text is the merged raw text.
        merged.to_model()?;
        let fresh = storage.patch_person(index, &merged, &entry.invalid_fields)?;
        info!(
            target: "propbook",
            event = "fix_applied",
            index,
            remaining_invalid = fresh.invalid_entries().len()
        );
        Ok(fresh)
    }
}
