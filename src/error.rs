//! Error types for pgxlate.

use thiserror::Error;

/// The main error type for translation.
#[derive(Debug, Error)]
pub enum XlateError {
    /// Node kind, function, operator or shape the generator cannot express.
    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    /// A property or variable does not resolve to a usable binding.
    #[error("Invalid binding '{found}': {reason}")]
    InvalidBinding { found: String, reason: String },

    /// Wrong number of arguments for a function or operator.
    #[error("Invalid arity for {name}: expected {expected}, got {actual}")]
    InvalidArity {
        name: String,
        expected: String,
        actual: usize,
    },

    /// No store type exists for an abstract type, or vice versa.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Failed to parse a store type name, a server version or a command tree.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl XlateError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    pub fn binding(found: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            found: found.into(),
            reason: reason.into(),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::InvalidArity {
            name: name.into(),
            expected: expected.into(),
            actual,
        }
    }

    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for XlateError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.column(), err.to_string())
    }
}

impl From<toml::de::Error> for XlateError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for translation.
pub type XlateResult<T> = Result<T, XlateError>;
