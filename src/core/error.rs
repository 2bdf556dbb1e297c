//! Purpose: Define the single error type shared by the store, API, server and CLI.
//! Exports: `Error`, `ErrorKind`, `FieldIssue`, `to_exit_code`.
//! Role: Builder-style error carrying a stable kind plus optional context.
//! Invariants: Kinds are stable; exit codes and wire names derive from them.
//! Invariants: Not-found lookups are results, not errors; `NotFound` is for routing.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Validation,
    NotFound,
    Busy,
    Storage,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::Usage => "Usage",
            ErrorKind::Validation => "Validation",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Busy => "Busy",
            ErrorKind::Storage => "Storage",
            ErrorKind::Io => "Io",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Internal" => Some(ErrorKind::Internal),
            "Usage" => Some(ErrorKind::Usage),
            "Validation" => Some(ErrorKind::Validation),
            "NotFound" => Some(ErrorKind::NotFound),
            "Busy" => Some(ErrorKind::Busy),
            "Storage" => Some(ErrorKind::Storage),
            "Io" => Some(ErrorKind::Io),
            _ => None,
        }
    }
}

/// One offending input field and the reason it was rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    id: Option<i64>,
    issues: Vec<FieldIssue>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            id: None,
            issues: Vec::new(),
            source: None,
        }
    }

    /// Validation error built from the collected field issues.
    pub fn validation(issues: Vec<FieldIssue>) -> Self {
        let message = match issues.as_slice() {
            [issue] => format!("invalid input: {}: {}", issue.field, issue.message),
            _ => format!("invalid input: {} fields rejected", issues.len()),
        };
        Self::new(ErrorKind::Validation)
            .with_message(message)
            .with_field_issues(issues)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field_issues(mut self, issues: impl IntoIterator<Item = FieldIssue>) -> Self {
        self.issues.extend(issues);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(id) = self.id {
            write!(f, " (id: {id})")?;
        }
        for issue in &self.issues {
            write!(f, " [{}: {}]", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Validation => 3,
        ErrorKind::NotFound => 4,
        ErrorKind::Busy => 5,
        ErrorKind::Storage => 6,
        ErrorKind::Io => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, FieldIssue, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Validation, 3),
            (ErrorKind::NotFound, 4),
            (ErrorKind::Busy, 5),
            (ErrorKind::Storage, 6),
            (ErrorKind::Io, 7),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            ErrorKind::Internal,
            ErrorKind::Usage,
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Busy,
            ErrorKind::Storage,
            ErrorKind::Io,
        ] {
            assert_eq!(ErrorKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::parse("Bogus"), None);
    }

    #[test]
    fn validation_error_names_single_field() {
        let err = Error::validation(vec![FieldIssue::new("email", "Invalid email")]);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), Some("invalid input: email: Invalid email"));
        assert_eq!(err.issues().len(), 1);
        assert!(err.to_string().contains("[email: Invalid email]"));
    }
}
