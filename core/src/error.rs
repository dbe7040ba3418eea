//! Error taxonomy for the data layer.
//!
//! - **NotFound**: a question, chapter or image is absent.
//! - **Validation**: a payload failed its schema; carries every field error.
//! - **Store**: the backing file could not be read or written. Not
//!   recoverable by the caller.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERROR: &str = "non_field_error";

/// Failure reading or writing a backing JSON file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Field path → message, in field-path order.
///
/// Serializes as a flat JSON object, which is also the 400 response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error that applies to the payload as a whole.
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(NON_FIELD_ERROR, message);
        errors
    }

    /// Record an error for `field`. The first error recorded for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Merge `other` under `prefix`, producing paths such as `chapters.2.route`.
    pub fn extend_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(format!("{prefix}.{field}"), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors surfaced by the repositories.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// `lookup` is the question id, or the rendered filters for searches.
    #[error("question not found: {lookup}")]
    QuestionNotFound { lookup: String },

    #[error("chapter not found: {chapter}")]
    ChapterNotFound { chapter: String },

    #[error("image not found: {filename}")]
    ImageNotFound { filename: String },

    #[error("missing filter arguments")]
    MissingFilters,

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DataError {
    /// Entity-absent errors, including referential failures found during joins.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QuestionNotFound { .. } | Self::ChapterNotFound { .. } | Self::ImageNotFound { .. }
        )
    }

    /// The structured error map, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for DataError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}
