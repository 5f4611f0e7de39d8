use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::raw::{RawPerson, RawProperty};
use super::report::{LoadReport, LoadReportBuilder, DUPLICATE_REASON};
use super::StorageError;

/// File contents, or `None` when the file is absent or blank.
pub(crate) fn read_text(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(None),
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::io(path, err)),
    }
}

fn array_at<'a>(root: &'a Value, key: &str, path: &Path) -> Result<&'a [Value], StorageError> {
    let object = root
        .as_object()
        .ok_or_else(|| StorageError::structural(path, "root is not a JSON object"))?;
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(StorageError::structural(
            path,
            format!("`{key}` is not an array"),
        )),
    }
}

/// Loads `path` into a [`LoadReport`]. An absent or blank file is an empty report.
pub fn load_report(path: &Path) -> Result<LoadReport, StorageError> {
    let Some(text) = read_text(path)? else {
        debug!(target: "propbook", event = "address_book_absent", path = %path.display());
        return Ok(LoadReport::empty());
    };
    let root: Value = serde_json::from_str(&text)
        .map_err(|err| StorageError::structural(path, format!("not parseable JSON: {err}")))?;
    let report = classify(&root, path)?;

    let summary = report.summary();
    info!(
        target: "propbook",
        event = "address_book_loaded",
        path = %path.display(),
        valid_persons = summary.valid_persons,
        invalid_persons = summary.invalid_persons,
        properties = summary.properties
    );
    Ok(report)
}

/// Partitions a decoded document. Every person element ends up either in the
/// snapshot or in the invalid list, never both and never neither.
pub fn classify(root: &Value, path: &Path) -> Result<LoadReport, StorageError> {
    let persons = array_at(root, "persons", path)?;
    let properties = array_at(root, "properties", path)?;
    let mut builder = LoadReportBuilder::default();

    for (index, element) in persons.iter().enumerate() {
        let raw = match RawPerson::from_value(element) {
            Ok(raw) => raw,
            Err(err) => {
                let raw = RawPerson::default();
                let invalid = raw.diagnose_invalid_fields();
                warn!(
                    target: "propbook",
                    event = "person_quarantined",
                    index,
                    reason = "not_an_object",
                    error = %err
                );
                let reason = format!("record is not a JSON object: {err}");
                builder.quarantine(index, reason, raw, invalid);
                continue;
            }
        };

        match raw.to_model() {
            Ok(person) => {
                if let Err(err) = builder.book_mut().add_person(person) {
                    warn!(
                        target: "propbook",
                        event = "person_quarantined",
                        index,
                        reason = "duplicate",
                        error = %err,
                        raw = %raw.to_raw_diagnostic()
                    );
                    builder.quarantine(index, DUPLICATE_REASON, raw, Default::default());
                }
            }
            Err(err) => {
                let invalid = raw.diagnose_invalid_fields();
                warn!(
                    target: "propbook",
                    event = "person_quarantined",
                    index,
                    reason = %err,
                    raw = %raw.to_raw_diagnostic()
                );
                builder.quarantine(index, err.to_string(), raw, invalid);
            }
        }
    }

    for (index, element) in properties.iter().enumerate() {
        let raw = RawProperty::from_value(element).map_err(|err| {
            let reason = format!("properties[{index}] is not a JSON object: {err}");
            StorageError::structural(path, reason)
        })?;
        let property = raw
            .to_model()
            .map_err(|source| StorageError::InvalidProperty { index, source })?;
        let name = property.property_name.to_string();
        builder
            .book_mut()
            .add_property(property)
            .map_err(|_| StorageError::DuplicateProperty { index, name })?;
    }

    Ok(builder.build())
}
