//! Import configuration.
//!
//! Read from `--config <path>` or `$XDG_CONFIG_HOME/broker-import/config.toml`.
//! A missing file means defaults; a malformed one is an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ImportError;
use crate::importers::locale::Locale;

/// Overrides `default_locale` when set.
pub const LOCALE_ENV: &str = "BROKER_IMPORT_LOCALE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Locale for the generic path; adapters carry their own default
    pub default_locale: String,
    /// Bytes of decoded text handed to the detectors
    pub sample_bytes: usize,
    /// Minimum confidence for a required role to auto-resolve
    pub confidence_threshold: f64,
    /// Rows used for value-shape scoring and returned for review
    pub sample_rows: usize,
    /// Row preview length in warnings
    pub warning_row_chars: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_locale: "en-US".to_string(),
            sample_bytes: 4096,
            confidence_threshold: 0.6,
            sample_rows: 20,
            warning_row_chars: 120,
        }
    }
}

impl ImportConfig {
    pub fn default_config_path() -> Option<PathBuf> {
        dir_spec::config_home().map(|dir| dir.join("broker-import").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ImportError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    ImportError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!("Loading config from {:?}", path);
                    let text = fs::read_to_string(&path)?;
                    Self::from_toml_str(&text)?
                }
                None => Self::default(),
            },
        };

        let config = config.with_locale_override(std::env::var(LOCALE_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ImportError> {
        toml::from_str(text).map_err(|e| ImportError::Config(e.to_string()))
    }

    /// Apply a `BROKER_IMPORT_LOCALE` value; blank values are ignored.
    pub fn with_locale_override(mut self, locale: Option<String>) -> Self {
        if let Some(tag) = locale.filter(|t| !t.trim().is_empty()) {
            self.default_locale = tag.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        Locale::parse(&self.default_locale)?;
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ImportError::Config(format!(
                "confidence_threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            )));
        }
        if self.sample_bytes == 0 || self.sample_rows == 0 {
            return Err(ImportError::Config(
                "sample_bytes and sample_rows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.default_locale, "en-US");
        assert_eq!(config.sample_bytes, 4096);
        assert_eq!(config.confidence_threshold, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ImportConfig::from_toml_str("default_locale = \"de-DE\"\n").unwrap();
        assert_eq!(config.default_locale, "de-DE");
        assert_eq!(config.sample_rows, 20);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = ImportConfig::from_toml_str("sample_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "confidence_threshold = 0.75\nwarning_row_chars = 60").unwrap();
        let config = ImportConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.warning_row_chars, 60);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImportConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ImportConfig {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ImportConfig {
            default_locale: "xx-YY".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ImportError::UnsupportedLocale(_))));
    }

    #[test]
    fn test_locale_override() {
        let config = ImportConfig::default().with_locale_override(Some("en-GB".to_string()));
        assert_eq!(config.default_locale, "en-GB");
        let config = ImportConfig::default().with_locale_override(Some("  ".to_string()));
        assert_eq!(config.default_locale, "en-US");
    }
}
