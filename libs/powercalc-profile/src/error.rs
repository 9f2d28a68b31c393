//! Profile Library Error Types

use thiserror::Error;

use crate::identity::DeviceIdentity;

/// Result type for profile library operations
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Coarse classification of a [`LibraryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ParseError,
    ValidationError,
    Io,
    Remote,
    Internal,
}

/// Profile library errors
///
/// Cloneable so one failed load can be delivered to every caller waiting on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LibraryError {
    /// No profile exists for the requested manufacturer/model
    #[error("Profile not found: manufacturer={manufacturer}, model={model}")]
    NotFound { manufacturer: String, model: String },

    /// A profile document (or remote manifest) is malformed
    #[error("Profile parse error: {origin}: {message}")]
    ParseError { origin: String, message: String },

    /// Supplied variables or identity do not satisfy the profile contract
    #[error("{message}")]
    ValidationError {
        message: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Local backing store I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// Remote library transport error
    #[error("Remote library error: {0}")]
    Remote(String),

    /// Load task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for LibraryError {
    fn from(err: reqwest::Error) -> Self {
        LibraryError::Remote(err.to_string())
    }
}

// Helper methods
impl LibraryError {
    pub fn not_found(identity: &DeviceIdentity) -> Self {
        LibraryError::NotFound {
            manufacturer: identity.manufacturer().to_string(),
            model: identity.model().to_string(),
        }
    }

    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        LibraryError::ParseError {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LibraryError::ValidationError {
            message: message.into(),
            missing: Vec::new(),
            unexpected: Vec::new(),
        }
    }

    /// Build a variable mismatch error naming every offending field.
    pub fn variables(missing: Vec<String>, unexpected: Vec<String>) -> Self {
        let mut parts = Vec::with_capacity(2);
        if !missing.is_empty() {
            parts.push(format!("Missing variables for fields: {}", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            parts.push(format!("Unexpected variables: {}", unexpected.join(", ")));
        }

        LibraryError::ValidationError {
            message: parts.join("; "),
            missing,
            unexpected,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        LibraryError::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::NotFound { .. } => ErrorKind::NotFound,
            LibraryError::ParseError { .. } => ErrorKind::ParseError,
            LibraryError::ValidationError { .. } => ErrorKind::ValidationError,
            LibraryError::Io(_) => ErrorKind::Io,
            LibraryError::Remote(_) => ErrorKind::Remote,
            LibraryError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Fields declared by the profile but absent from the supplied variables
    pub fn missing_fields(&self) -> &[String] {
        match self {
            LibraryError::ValidationError { missing, .. } => missing,
            _ => &[],
        }
    }

    /// Supplied variables that the profile does not declare
    pub fn unexpected_fields(&self) -> &[String] {
        match self {
            LibraryError::ValidationError { unexpected, .. } => unexpected,
            _ => &[],
        }
    }
}
