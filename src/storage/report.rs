use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use ts_rs::TS;

use super::raw::RawPerson;
use crate::model::{AddressBook, FieldKey};

/// Reason recorded when a valid person repeats an earlier person's name.
pub const DUPLICATE_REASON: &str =
    "duplicate identity: a person with this name appears earlier in the file";

/// One quarantined person element.
///
/// `index` is the element's position in the on-disk `persons` array at the
/// time of the load that produced it. Any overwrite invalidates it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvalidEntry {
    pub index: usize,
    pub reason: String,
    pub raw: RawPerson,
    pub invalid_fields: BTreeSet<FieldKey>,
}

impl InvalidEntry {
    /// Quarantined because its name repeats an earlier valid person.
    pub fn is_duplicate(&self) -> bool {
        self.invalid_fields.is_empty()
    }

    /// 1-based position for display and the `fix` command.
    pub fn display_index(&self) -> usize {
        self.index + 1
    }
}

/// Result of one load pass: the valid snapshot and the quarantined persons.
///
/// Immutable once built and cheap to clone; a new report replaces an old one
/// after every mutation of the backing file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    book: Arc<AddressBook>,
    invalid: Arc<[InvalidEntry]>,
}

impl LoadReport {
    pub fn empty() -> Self {
        LoadReportBuilder::default().build()
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    pub fn invalid_entries(&self) -> &[InvalidEntry] {
        &self.invalid
    }

    pub fn has_invalid(&self) -> bool {
        !self.invalid.is_empty()
    }

    /// Number of raw person elements this report classified.
    pub fn total_persons(&self) -> usize {
        self.book.persons().len() + self.invalid.len()
    }

    pub fn entry_at(&self, index: usize) -> Option<&InvalidEntry> {
        self.invalid.iter().find(|entry| entry.index == index)
    }

    /// Lowest-index entry that has at least one field to repair.
    pub fn next_repairable(&self) -> Option<&InvalidEntry> {
        self.invalid.iter().find(|entry| !entry.is_duplicate())
    }

    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            valid_persons: self.book.persons().len(),
            properties: self.book.properties().len(),
            invalid_persons: self.invalid.len(),
            duplicate_persons: self.invalid.iter().filter(|e| e.is_duplicate()).count(),
        }
    }
}

/// Counts the UI shows after a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoadSummary {
    pub valid_persons: usize,
    pub properties: usize,
    pub invalid_persons: usize,
    pub duplicate_persons: usize,
}

/// Accumulates a load pass; [`LoadReportBuilder::build`] freezes it.
#[derive(Debug, Default)]
pub(crate) struct LoadReportBuilder {
    book: AddressBook,
    invalid: Vec<InvalidEntry>,
}

impl LoadReportBuilder {
    pub(crate) fn book_mut(&mut self) -> &mut AddressBook {
        &mut self.book
    }

    pub(crate) fn quarantine(
        &mut self,
        index: usize,
        reason: impl Into<String>,
        raw: RawPerson,
        invalid_fields: BTreeSet<FieldKey>,
    ) {
        self.invalid.push(InvalidEntry {
            index,
            reason: reason.into(),
            raw,
            invalid_fields,
        });
    }

    pub(crate) fn build(self) -> LoadReport {
        LoadReport {
            book: Arc::new(self.book),
            invalid: self.invalid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_nothing() {
        let report = LoadReport::empty();
        assert!(report.address_book().is_empty());
        assert!(!report.has_invalid());
        assert_eq!(report.total_persons(), 0);
        assert_eq!(report.summary().invalid_persons, 0);
    }

    #[test]
    fn next_repairable_skips_duplicates() {
        let mut builder = LoadReportBuilder::default();
        builder.quarantine(1, DUPLICATE_REASON, RawPerson::default(), BTreeSet::new());
        builder.quarantine(
            3,
            "bad phone",
            RawPerson::default(),
            BTreeSet::from([FieldKey::Phone]),
        );
        let report = builder.build();

        assert_eq!(report.next_repairable().map(|e| e.index), Some(3));
        assert_eq!(report.entry_at(1).map(InvalidEntry::is_duplicate), Some(true));
        assert_eq!(report.summary().duplicate_persons, 1);
        assert_eq!(report.invalid_entries()[1].display_index(), 4);
    }

    #[test]
    fn entries_serialize_for_the_ui() {
        let mut builder = LoadReportBuilder::default();
        builder.quarantine(
            0,
            "bad",
            RawPerson {
                name: Some("Alice".into()),
                ..RawPerson::default()
            },
            BTreeSet::from([FieldKey::Phone, FieldKey::Email]),
        );
        let report = builder.build();
        let json = serde_json::to_value(&report.invalid_entries()[0]).unwrap();
        assert_eq!(json["invalidFields"], serde_json::json!(["phone", "email"]));
        assert_eq!(json["raw"]["name"], "Alice");
    }
}
