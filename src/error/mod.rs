use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use ts_rs::TS;

use crate::model::FieldError;
use crate::storage::StorageError;

/// A structured application error that can be serialized and surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppError {
    /// Machine readable error code.
    pub code: String,
    /// Human friendly message that can be shown directly to the user.
    pub message: String,
    /// Arbitrary key/value pairs that provide additional context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[ts(type = "Record<string, string>")]
    pub context: HashMap<String, String>,
    /// Optional nested cause that preserves the error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    /// Adds a contextual key/value pair to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets the nested cause for the error.
    pub fn with_cause(mut self, cause: impl Into<AppError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {} ({:?})", self.code, self.message, self.context)
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<IoError> for AppError {
    fn from(error: IoError) -> Self {
        let code = format!("IO/{:?}", error.kind());
        let mut app_error = AppError::new(code, error.to_string());
        if let Some(os_code) = error.raw_os_error() {
            app_error = app_error.with_context("os_code", os_code.to_string());
        }
        app_error
    }
}

impl From<SerdeJsonError> for AppError {
    fn from(error: SerdeJsonError) -> Self {
        let code = if error.is_data() {
            "JSON/DATA"
        } else if error.is_syntax() {
            "JSON/SYNTAX"
        } else if error.is_eof() {
            "JSON/EOF"
        } else if error.is_io() {
            "JSON/IO"
        } else {
            "JSON/ERROR"
        };

        let mut app_error = AppError::new(code, error.to_string());
        let line = error.line();
        if line > 0 {
            app_error = app_error.with_context("line", line.to_string());
        }
        let column = error.column();
        if column > 0 {
            app_error = app_error.with_context("column", column.to_string());
        }
        app_error
    }
}

impl From<FieldError> for AppError {
    fn from(error: FieldError) -> Self {
        AppError::new(format!("VALIDATION/{}", error.key.as_str()), error.message)
            .with_context("field", error.key.as_str())
    }
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        let message = error.to_string();
        match error {
            StorageError::Structural { path, .. } => {
                AppError::new("STORAGE/STRUCTURAL", message).with_context("path", path)
            }
            StorageError::IndexOutOfRange { index, len } => {
                AppError::new("STORAGE/INDEX_OUT_OF_RANGE", message)
                    .with_context("index", index.to_string())
                    .with_context("len", len.to_string())
            }
            StorageError::Io { path, source } => AppError::from(source)
                .with_context("path", path)
                .with_context("operation", "storage_io"),
            StorageError::InvalidProperty { index, source } => {
                AppError::new("STORAGE/INVALID_PROPERTY", message)
                    .with_context("index", index.to_string())
                    .with_cause(source)
            }
            StorageError::DuplicateProperty { index, .. } => {
                AppError::new("STORAGE/DUPLICATE_PROPERTY", message)
                    .with_context("index", index.to_string())
            }
            StorageError::Serialize(source) => AppError::from(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKey;

    #[test]
    fn builds_error_with_context_and_cause() {
        let error = AppError::new("TEST/CODE", "Something went wrong")
            .with_context("entity", "person")
            .with_context("index", "3")
            .with_cause(AppError::new("TEST/INNER", "inner failure"));

        assert_eq!(error.code(), "TEST/CODE");
        assert_eq!(error.message(), "Something went wrong");
        assert_eq!(error.context().get("entity"), Some(&"person".to_string()));
        assert_eq!(error.context().get("index"), Some(&"3".to_string()));
        let cause = error.cause().expect("cause present");
        assert_eq!(cause.message(), "inner failure");
        assert_eq!(cause.code(), "TEST/INNER");
    }

    #[test]
    fn invalid_property_keeps_the_field_error_as_cause() {
        let err = StorageError::InvalidProperty {
            index: 2,
            source: FieldError::new(FieldKey::Price, "Price must be a positive amount"),
        };
        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), "STORAGE/INVALID_PROPERTY");
        assert_eq!(app_error.context().get("index"), Some(&"2".to_string()));
        let cause = app_error.cause().expect("field cause present");
        assert_eq!(cause.code(), "VALIDATION/price");
    }

    #[test]
    fn app_error_propagates_into_anyhow() {
        fn run_fix() -> anyhow::Result<()> {
            let outcome: AppResult<()> =
                Err(AppError::new("REPAIR/NOT_QUARANTINED", "nothing to fix"));
            outcome?;
            Ok(())
        }
        let err = run_fix().unwrap_err();
        assert_eq!(
            err.downcast_ref::<AppError>().map(AppError::code),
            Some("REPAIR/NOT_QUARANTINED")
        );
    }

    #[test]
    fn serde_json_errors_capture_position() {
        let err: SerdeJsonError =
            serde_json::from_str::<serde_json::Value>("{\"persons\": }").expect_err("invalid json");
        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), "JSON/SYNTAX");
        assert!(app_error.context().contains_key("line"));
        assert!(app_error.context().contains_key("column"));
    }

    #[test]
    fn field_errors_carry_the_field_key() {
        let err = FieldError::new(FieldKey::Phone, "Phone numbers should only contain digits");
        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), "VALIDATION/phone");
        assert_eq!(app_error.context().get("field"), Some(&"phone".to_string()));
    }

    #[test]
    fn index_out_of_range_maps_to_stable_code() {
        let app_error = AppError::from(StorageError::IndexOutOfRange { index: 7, len: 3 });
        assert_eq!(app_error.code(), "STORAGE/INDEX_OUT_OF_RANGE");
        assert_eq!(app_error.context().get("len"), Some(&"3".to_string()));
    }

    #[test]
    fn io_error_contains_raw_code_when_available() {
        let err = IoError::from_raw_os_error(2);
        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), "IO/NotFound");
        assert_eq!(app_error.context().get("os_code"), Some(&"2".to_string()));
    }
}
