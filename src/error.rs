//! Unified error hierarchy for gpxhr
//!
//! Every fallible core operation returns [`GpxHrError`]. The command line
//! shell turns it into a user-facing message through [`GpxHrError::user_message`].

use thiserror::Error;

/// Top-level error type for all gpxhr operations
#[derive(Debug, Error)]
pub enum GpxHrError {
    /// Rejected caller input (malformed date, negative duration, bad alpha)
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The uploaded document declares no default XML namespace
    #[error("No default namespace declared on the GPX root element")]
    MissingNamespace,

    /// The uploaded bytes are not a well-formed XML document
    #[error("XML parse error: {0}")]
    Parse(#[from] ParseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Writing XML text failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Reasons a GPX document could not be read into a tree
#[derive(Debug, Error)]
pub enum ParseError {
    /// Error reported by the XML tokenizer
    #[error("malformed XML at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },

    /// Input bytes are not UTF-8
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// A start tag was never closed
    #[error("unclosed element <{name}>")]
    Unclosed { name: String },

    /// A closing tag has no matching start tag
    #[error("unexpected closing tag </{name}>")]
    UnexpectedEnd { name: String },

    /// No root element at all
    #[error("document has no root element")]
    NoRoot,

    /// Element or text found after the root element closed
    #[error("content after the root element")]
    TrailingContent,

    /// Well-formed XML that does not read as GPX
    #[error("GPX content rejected: {0}")]
    Gpx(String),
}

/// Result type alias for gpxhr operations
pub type Result<T> = std::result::Result<T, GpxHrError>;

impl GpxHrError {
    /// Shorthand for [`GpxHrError::InvalidInput`]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GpxHrError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GpxHrError::InvalidInput { .. } => ErrorSeverity::Warning,
            GpxHrError::MissingNamespace => ErrorSeverity::Error,
            GpxHrError::Parse(_) => ErrorSeverity::Error,
            GpxHrError::Io(_) => ErrorSeverity::Error,
            GpxHrError::Configuration(_) => ErrorSeverity::Error,
            GpxHrError::Serialization(_) => ErrorSeverity::Critical,
        }
    }

    /// Emit a tracing event at the level matching [`GpxHrError::severity`]
    pub fn log(&self) {
        match self.severity() {
            ErrorSeverity::Warning => tracing::warn!(error = %self, "Command rejected input"),
            ErrorSeverity::Error => tracing::error!(error = %self, "Command failed"),
            ErrorSeverity::Critical => {
                tracing::error!(error = %self, critical = true, "Command failed")
            }
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            GpxHrError::InvalidInput { field, reason } => {
                format!("Please check the {} you entered: {}", field, reason)
            }
            GpxHrError::MissingNamespace => {
                "Could not find a default namespace in the GPX file.".to_string()
            }
            GpxHrError::Parse(err) => {
                format!("The uploaded file is not a readable GPX document: {}", err)
            }
            _ => self.to_string(),
        }
    }
}

impl From<quick_xml::Error> for GpxHrError {
    fn from(err: quick_xml::Error) -> Self {
        GpxHrError::Serialization(err.to_string())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Internal failure that should never happen on valid input
    Critical,
    /// Error that prevents the operation
    Error,
    /// Input problem the user can fix
    Warning,
}
