use std::io::{BufRead, Write};

use super::{FieldCorrections, RepairPrompt};
use crate::model::PERSON_FIELD_ORDER;
use crate::storage::InvalidEntry;

const CANCEL: &str = ":q";

/// Line-oriented prompt: shows the kept fields and asks once per flagged field.
/// `:q` or end of input cancels.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(
        &mut self,
        entry: &InvalidEntry,
        last_error: Option<&str>,
    ) -> std::io::Result<Option<FieldCorrections>> {
        writeln!(
            self.output,
            "Record #{} could not be loaded: {}",
            entry.display_index(),
            entry.reason
        )?;
        if let Some(err) = last_error {
            writeln!(self.output, "Previous attempt failed: {err}")?;
        }
        for key in PERSON_FIELD_ORDER {
            if entry.invalid_fields.contains(&key) {
                continue;
            }
            if let Some(value) = entry.raw.field_text(key).filter(|v| !v.is_empty()) {
                writeln!(self.output, "  {key}: {value}")?;
            }
        }
        writeln!(self.output, "Enter corrected values ({CANCEL} to cancel):")?;

        let mut corrections = FieldCorrections::new();
        for key in &entry.invalid_fields {
            let current = entry.raw.field_text(*key).unwrap_or_default();
            write!(self.output, "  {key} [{current}]: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let value = line.trim_end_matches(['\r', '\n']);
            if value.trim() == CANCEL {
                return Ok(None);
            }
            corrections.insert(*key, value.to_string());
        }
        Ok(Some(corrections))
    }
}

impl<R: BufRead, W: Write> RepairPrompt for TerminalPrompt<R, W> {
    fn request_corrections(
        &mut self,
        entry: &InvalidEntry,
        last_error: Option<&str>,
    ) -> Option<FieldCorrections> {
        match self.ask(entry, last_error) {
            Ok(corrections) => corrections,
            Err(err) => {
                tracing::warn!(target: "propbook", event = "repair_prompt_io_failed", error = %err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKey;
    use crate::storage::RawPerson;
    use std::collections::BTreeSet;

    fn entry() -> InvalidEntry {
        InvalidEntry {
            index: 2,
            reason: "phone: bad".into(),
            raw: RawPerson {
                name: Some("Alice".into()),
                phone: Some("9".into()),
                email: Some("bad".into()),
                address: Some("x".into()),
                ..RawPerson::default()
            },
            invalid_fields: BTreeSet::from([FieldKey::Phone, FieldKey::Email]),
        }
    }

    #[test]
    fn collects_one_line_per_flagged_field() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new(&b"91234567\na@b.com\n"[..], &mut out);
        let corrections = prompt.request_corrections(&entry(), None).unwrap();
        assert_eq!(corrections.get(&FieldKey::Phone).map(String::as_str), Some("91234567"));
        assert_eq!(corrections.get(&FieldKey::Email).map(String::as_str), Some("a@b.com"));

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Record #3"));
        assert!(shown.contains("  name: Alice"));
        assert!(shown.contains("phone [9]: "));
    }

    #[test]
    fn quit_or_eof_cancels() {
        let mut prompt = TerminalPrompt::new(&b"91234567\n:q\n"[..], Vec::new());
        assert!(prompt.request_corrections(&entry(), None).is_none());

        let mut prompt = TerminalPrompt::new(&b"91234567\n"[..], Vec::new());
        assert!(prompt.request_corrections(&entry(), None).is_none());
    }

    #[test]
    fn shows_the_previous_failure() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new(&b"1\n2\n"[..], &mut out);
        prompt.request_corrections(&entry(), Some("Phone numbers should only contain digits"));
        assert!(String::from_utf8(out).unwrap().contains("Previous attempt failed"));
    }
}
