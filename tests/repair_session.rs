use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;

use propbook_lib::model::FieldKey;
use propbook_lib::repair::{FieldCorrections, RepairOutcome, RepairSession, TerminalPrompt};
use propbook_lib::{InvalidEntry, JsonAddressBookStorage};
use serde_json::{json, Value};
use tempfile::tempdir;

fn storage_with(dir: &std::path::Path, persons: Value) -> JsonAddressBookStorage {
    let path = dir.join("addressbook.json");
    let doc = json!({ "persons": persons, "properties": [] });
    fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    JsonAddressBookStorage::new(path)
}

fn persons_on_disk(storage: &JsonAddressBookStorage) -> Vec<Value> {
    let doc: Value = serde_json::from_slice(&fs::read(storage.path()).unwrap()).unwrap();
    doc["persons"].as_array().cloned().unwrap()
}

#[test]
fn repair_only_touches_flagged_fields() {
    let dir = tempdir().unwrap();
    let storage = storage_with(
        dir.path(),
        json!([
            {
                "name": "Eve Adams", "phone": "12", "email": "eve@corp.io",
                "address": "12 Elm Rd, #04-01"
            }
        ]),
    );

    let mut asked = Vec::new();
    let prompt = |entry: &InvalidEntry, _: Option<&str>| {
        asked.push(entry.invalid_fields.clone());
        Some(FieldCorrections::from([
            (FieldKey::Phone, "91234567".to_string()),
            (FieldKey::Name, "Someone Else".to_string()),
        ]))
    };
    let outcome = RepairSession::new(&storage, prompt).run().unwrap();

    assert!(matches!(outcome, RepairOutcome::Done { repaired: 1, .. }));
    assert_eq!(asked, [BTreeSet::from([FieldKey::Phone])]);
    let persons = persons_on_disk(&storage);
    assert_eq!(persons[0]["name"], "Eve Adams");
    assert_eq!(persons[0]["email"], "eve@corp.io");
    assert_eq!(persons[0]["address"], "12 Elm Rd, #04-01");
    assert_eq!(persons[0]["phone"], "91234567");
}

#[test]
fn repair_keeps_unknown_keys_and_untouched_text() {
    let dir = tempdir().unwrap();
    let storage = storage_with(
        dir.path(),
        json!([{
            "name": "Zoe\u{308}", "phone": "1", "email": "zoe@b.com", "address": "x",
            "listing": "Buyer", "nickname": "Evie"
        }]),
    );

    let prompt = |_: &InvalidEntry, _: Option<&str>| {
        Some(FieldCorrections::from([(FieldKey::Phone, "91234567".to_string())]))
    };
    let outcome = RepairSession::new(&storage, prompt).run().unwrap();

    assert!(matches!(outcome, RepairOutcome::Done { repaired: 1, .. }));
    let persons = persons_on_disk(&storage);
    assert_eq!(persons[0]["nickname"], "Evie");
    assert_eq!(persons[0]["name"].as_str().unwrap(), "Zoe\u{308}");
    assert_eq!(persons[0]["listing"], "Buyer");
    assert_eq!(persons[0]["phone"], "91234567");
}

#[test]
fn session_repairs_every_entry_and_skips_duplicates() {
    let dir = tempdir().unwrap();
    let storage = storage_with(
        dir.path(),
        json!([
            {"name": "Alice", "phone": "91234567", "email": "a@b.com", "address": "x"},
            {"name": "Bob", "phone": "98765432", "email": "nope", "address": "y"},
            {"name": "Alice", "phone": "81234567", "email": "c@b.com", "address": "z"},
            {"name": "Carl", "phone": "93334444", "email": "c@c.com", "address": " "}
        ]),
    );

    let mut visited = Vec::new();
    let prompt = |entry: &InvalidEntry, _: Option<&str>| {
        visited.push(entry.index);
        let corrections = entry
            .invalid_fields
            .iter()
            .map(|key| {
                let value = match key {
                    FieldKey::Email => "bob@b.com",
                    _ => "5 Pine Ave",
                };
                (*key, value.to_string())
            })
            .collect();
        Some(corrections)
    };
    let outcome = RepairSession::new(&storage, prompt).run().unwrap();

    assert_eq!(visited, [1, 3]);
    match outcome {
        RepairOutcome::Done { report, repaired } => {
            assert_eq!(repaired, 2);
            assert_eq!(report.invalid_entries().len(), 1);
            assert!(report.invalid_entries()[0].is_duplicate());
            assert_eq!(report.address_book().persons().len(), 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(persons_on_disk(&storage).len(), 4);
}

#[test]
fn terminal_prompt_drives_a_session() {
    let dir = tempdir().unwrap();
    let storage = storage_with(
        dir.path(),
        json!([{"name": "Fay", "phone": "x1", "email": "fay@b.com", "address": "q"}]),
    );

    let input = Cursor::new(b"91239123\n".to_vec());
    let mut output = Vec::new();
    let outcome = RepairSession::new(&storage, TerminalPrompt::new(input, &mut output))
        .run()
        .unwrap();

    assert!(matches!(outcome, RepairOutcome::Done { repaired: 1, .. }));
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains("Record #1"));
    assert!(shown.contains("phone [x1]"));
}

#[test]
fn quitting_the_terminal_prompt_cancels_without_writing() {
    let dir = tempdir().unwrap();
    let storage = storage_with(
        dir.path(),
        json!([{"name": "Fay", "phone": "x1", "email": "fay@b.com", "address": "q"}]),
    );
    let before = fs::read(storage.path()).unwrap();

    let input = Cursor::new(b":q\n".to_vec());
    let outcome = RepairSession::new(&storage, TerminalPrompt::new(input, Vec::new()))
        .run()
        .unwrap();

    assert_eq!(outcome, RepairOutcome::Cancelled { repaired: 0 });
    assert_eq!(fs::read(storage.path()).unwrap(), before);
}
