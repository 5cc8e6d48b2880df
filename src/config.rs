//! Translator configuration, loaded from `pgxlate.toml`.
//!
//! ```toml
//! server_version = "9.4"
//! parameterize_dml_constants = true
//! parameterize_query_constants = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dialect::ServerVersion;
use crate::error::XlateResult;

/// File looked up in the working directory by [`TranslatorConfig::discover`].
pub const LOCAL_CONFIG: &str = "pgxlate.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Target server; decides the operator precedence regime. Unreadable
    /// values fall back to [`ServerVersion::DEFAULT`].
    #[serde(deserialize_with = "lenient_version")]
    pub server_version: ServerVersion,
    /// Lift constants in INSERT/UPDATE/DELETE into `@p_N` parameters.
    pub parameterize_dml_constants: bool,
    /// Lift constants in queries into `@p_N` parameters.
    pub parameterize_query_constants: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            server_version: ServerVersion::DEFAULT,
            parameterize_dml_constants: true,
            parameterize_query_constants: false,
        }
    }
}

impl TranslatorConfig {
    pub fn for_version(version: &str) -> Self {
        Self {
            server_version: ServerVersion::parse_or_default(version),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> XlateResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a config file.
    pub fn load(path: impl AsRef<Path>) -> XlateResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// `./pgxlate.toml`, then `<config dir>/pgxlate/config.toml`, else defaults.
    pub fn discover() -> XlateResult<Self> {
        for candidate in candidates() {
            if candidate.is_file() {
                tracing::trace!(path = %candidate.display(), "loading translator config");
                return Self::load(&candidate);
            }
        }
        tracing::trace!("no translator config found, using defaults");
        Ok(Self::default())
    }
}

fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pgxlate").join("config.toml"));
    }
    paths
}

/// Accept `"9.6.3"` as well as a bare major like `16`; unreadable strings
/// become the default version. Floats are rejected since `9.10` would read
/// as 9.1.
fn lenient_version<'de, D>(deserializer: D) -> Result<ServerVersion, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => {
            return Err(D::Error::custom(format!(
                "server_version must be a string such as \"9.10\", found the number {}",
                f
            )));
        }
    };
    Ok(ServerVersion::parse_or_default(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Precedence;

    #[test]
    fn test_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.server_version, ServerVersion::new(9, 5, 0));
        assert!(config.parameterize_dml_constants);
        assert!(!config.parameterize_query_constants);
        assert_eq!(TranslatorConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_version_forms() {
        let config = TranslatorConfig::from_toml_str("server_version = \"9.6.3\"").unwrap();
        assert_eq!(config.server_version, ServerVersion::new(9, 6, 3));

        let config = TranslatorConfig::from_toml_str("server_version = \"9.4\"").unwrap();
        assert_eq!(config.server_version.precedence(), Precedence::Legacy);

        let config = TranslatorConfig::from_toml_str("server_version = \"9.10\"").unwrap();
        assert_eq!(config.server_version, ServerVersion::new(9, 10, 0));

        let config = TranslatorConfig::from_toml_str("server_version = 16").unwrap();
        assert_eq!(config.server_version, ServerVersion::new(16, 0, 0));
    }

    #[test]
    fn test_float_version_is_rejected() {
        let err = TranslatorConfig::from_toml_str("server_version = 9.10").unwrap_err();
        assert!(matches!(err, crate::error::XlateError::Config(_)));
    }

    #[test]
    fn test_unreadable_version_falls_back() {
        let config = TranslatorConfig::from_toml_str("server_version = \"nightly\"").unwrap();
        assert_eq!(config.server_version, ServerVersion::DEFAULT);
        assert_eq!(TranslatorConfig::for_version("").server_version, ServerVersion::DEFAULT);
    }

    #[test]
    fn test_flags() {
        let config = TranslatorConfig::from_toml_str(
            "parameterize_dml_constants = false\nparameterize_query_constants = true",
        )
        .unwrap();
        assert!(!config.parameterize_dml_constants);
        assert!(config.parameterize_query_constants);
    }

    #[test]
    fn test_malformed_toml_is_a_config_error() {
        let err = TranslatorConfig::from_toml_str("server_version = [").unwrap_err();
        assert!(matches!(err, crate::error::XlateError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = TranslatorConfig::load("/nonexistent/pgxlate.toml").unwrap_err();
        assert!(matches!(err, crate::error::XlateError::Io(_)));
    }
}
