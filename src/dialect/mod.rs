//! PostgreSQL dialect rules: server version, identifier quoting, type
//! mapping and literal rendering.

pub mod literal;
mod parse;
pub mod types;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::XlateError;
use crate::sql::operators::Precedence;

pub use types::{ParameterType, StoreType, db_type_name, edm_type, parameter_type, store_type};

/// Server version a command is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// Assumed when no version is configured or the configured one is unreadable.
    pub const DEFAULT: ServerVersion = ServerVersion::new(9, 5, 0);

    /// First version with the reworked operator precedence.
    const MODERN_PRECEDENCE: ServerVersion = ServerVersion::new(9, 5, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse, falling back to [`ServerVersion::DEFAULT`].
    pub fn parse_or_default(input: &str) -> Self {
        input.parse().unwrap_or_else(|err| {
            tracing::debug!(version = input, error = %err, "unreadable server version, assuming default");
            Self::DEFAULT
        })
    }

    pub fn legacy_precedence(&self) -> bool {
        *self < Self::MODERN_PRECEDENCE
    }

    pub fn precedence(&self) -> Precedence {
        if self.legacy_precedence() {
            Precedence::Legacy
        } else {
            Precedence::Modern
        }
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for ServerVersion {
    type Err = XlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor, patch) = parse::server_version(s)?;
        Ok(Self::new(major, minor, patch))
    }
}

impl TryFrom<String> for ServerVersion {
    type Error = XlateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerVersion> for String {
    fn from(version: ServerVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.patch != 0 {
            write!(f, ".{}", self.patch)?;
        }
        Ok(())
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn write_identifier(name: &str, out: &mut String) {
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

/// Escape character the generator relies on inside LIKE patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Escape `%`, `_` and the escape character itself so `pattern` matches literally.
pub fn escape_like_argument(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}
