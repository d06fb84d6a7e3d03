use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    Range,
    Uniqueness,
    RequiredField,
    /// Never fatal.
    UnknownDiscriminant,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Format => "format",
            ErrorKind::Range => "range",
            ErrorKind::Uniqueness => "uniqueness",
            ErrorKind::RequiredField => "required_field",
            ErrorKind::UnknownDiscriminant => "unknown_discriminant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuleViolation {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuleViolation {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }

    pub fn uniqueness(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Uniqueness, message)
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequiredField, message)
    }

    pub fn on(self, field: &str) -> FieldError {
        FieldError {
            field: field.to_string(),
            kind: self.kind,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Never empty when returned from a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", join_errors(.errors))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn has(&self, field: &str, kind: ErrorKind) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && e.kind == kind)
    }
}

impl From<FieldError> for ValidationError {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ErrorCollector {
    errors: Vec<FieldError>,
}

impl ErrorCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the violation, if any, and hand back the value on success.
    pub(crate) fn check<T>(&mut self, field: &str, result: Result<T, RuleViolation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.errors.push(violation.on(field));
                None
            }
        }
    }

    pub(crate) fn check_opt<T>(
        &mut self,
        field: &str,
        result: Option<Result<T, RuleViolation>>,
    ) -> Option<T> {
        result.and_then(|r| self.check(field, r))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_error(self) -> ValidationError {
        ValidationError {
            errors: self.errors,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("not permitted: {0}")]
    NotPermitted(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
