use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::{to_raw_value, RawValue};
use tracing::info;

use super::atomic::write_atomic;
use super::loader::{self, read_text};
use super::raw::RawPerson;
use super::report::LoadReport;
use super::StorageError;
use crate::model::{FieldKey, Person, PERSON_FIELD_ORDER};

const PERSONS_KEY: &str = "persons";

/// Top-level value as written back: the spliced `persons` array or an
/// untouched slot copied verbatim.
#[derive(Serialize)]
#[serde(untagged)]
enum Slot<'a> {
    Elements(&'a [Box<RawValue>]),
    Verbatim(&'a RawValue),
}

/// One person element as its keys in file order, each value kept as read.
#[derive(Debug, Default)]
struct ElementFields(Vec<(String, Box<RawValue>)>);

impl ElementFields {
    /// Replaces `key` in place, appends it when absent, or drops it for `None`.
    fn set(&mut self, key: &str, value: Option<Box<RawValue>>) {
        let first = self.0.iter().position(|(existing, _)| existing == key);
        self.0.retain(|(existing, _)| existing != key);
        if let Some(value) = value {
            let at = first.unwrap_or(self.0.len());
            self.0.insert(at, (key.to_string(), value));
        }
    }
}

impl<'de> Deserialize<'de> for ElementFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = ElementFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ElementFields, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    fields.push(entry);
                }
                Ok(ElementFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

impl Serialize for ElementFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Replaces the person at `index` in the backing file and returns a fresh report.
///
/// Every known person field is rewritten from `person`. Keys the record model
/// does not know about stay on the element.
pub fn overwrite_person(
    path: &Path,
    index: usize,
    person: &Person,
) -> Result<LoadReport, StorageError> {
    write_fields(path, index, &RawPerson::from(person), PERSON_FIELD_ORDER)
}

/// Rewrites only `fields` of the person at `index` from `record`.
///
/// Used by repair: the other keys of the element keep their original bytes, so
/// values the user did not correct are never re-encoded or normalised.
pub fn patch_person(
    path: &Path,
    index: usize,
    record: &RawPerson,
    fields: &BTreeSet<FieldKey>,
) -> Result<LoadReport, StorageError> {
    write_fields(path, index, record, fields.iter().copied())
}

/// The file is re-read first. Every other element, and every other top-level
/// key, is copied back byte for byte; only the targeted slot is re-encoded.
/// An out-of-range index leaves the file untouched.
fn write_fields(
    path: &Path,
    index: usize,
    record: &RawPerson,
    fields: impl IntoIterator<Item = FieldKey>,
) -> Result<LoadReport, StorageError> {
    let root: BTreeMap<String, Box<RawValue>> = match read_text(path)? {
        Some(text) => serde_json::from_str(&text).map_err(|err| {
            StorageError::structural(path, format!("root is not a JSON object: {err}"))
        })?,
        None => BTreeMap::new(),
    };

    // Missing and null read as empty, matching the loader.
    let mut persons: Vec<Box<RawValue>> = match root.get(PERSONS_KEY) {
        Some(slot) => serde_json::from_str::<Option<Vec<Box<RawValue>>>>(slot.get())
            .map_err(|err| {
                StorageError::structural(path, format!("`{PERSONS_KEY}` is not an array: {err}"))
            })?
            .unwrap_or_default(),
        None => Vec::new(),
    };

    if index >= persons.len() {
        return Err(StorageError::IndexOutOfRange {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len: persons.len(),
        });
    }

    // A non-object element has nothing worth keeping.
    let mut element: ElementFields =
        serde_json::from_str(persons[index].get()).unwrap_or_default();
    let mut written = Vec::new();
    for key in fields {
        let value = record.field_value(key).map(|v| to_raw_value(&v)).transpose()?;
        element.set(key.as_str(), value);
        written.push(key.as_str());
    }
    persons[index] = RawValue::from_string(serde_json::to_string_pretty(&element)?)?;

    let mut document: BTreeMap<&str, Slot<'_>> = root
        .iter()
        .map(|(key, value)| (key.as_str(), Slot::Verbatim(&**value)))
        .collect();
    document.insert(PERSONS_KEY, Slot::Elements(&persons));

    let payload = serde_json::to_vec_pretty(&document)?;
    write_atomic(path, &payload).map_err(|err| StorageError::io(path, err))?;
    info!(
        target: "propbook",
        event = "person_overwritten",
        path = %path.display(),
        index,
        fields = ?written
    );

    loader::load_report(path)
}
