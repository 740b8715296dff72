//! Store configuration loaded from TOML.
//!
//! Unlike a global settings singleton, a `TmConfig` is parsed per store
//! and injected into [`crate::TmStore::open`], so two stores for different
//! source languages can coexist in one process.

use serde::Deserialize;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmConfig {
    pub tokenizer: TokenizerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenizerConfig {
    /// Source-string language ("en", "en_US", ...); selects the stop-word set.
    pub locale: String,
    /// Tokens shorter than this many characters are not indexed.
    pub min_token_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// WAL frame count that triggers a checkpoint + WAL truncation.
    pub wal_compact_threshold: usize,
}

impl Default for TmConfig {
    fn default() -> Self {
        parse_config_toml(DEFAULT_CONFIG_TOML).expect("embedded config TOML must be valid")
    }
}

impl TmConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        parse_config_toml(toml_str)
    }
}

/// Returns the embedded default config TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

pub fn parse_config_toml(toml_str: &str) -> Result<TmConfig, ConfigError> {
    let c: TmConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&c)?;
    Ok(c)
}

fn validate(c: &TmConfig) -> Result<(), ConfigError> {
    if c.tokenizer.locale.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "tokenizer.locale".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if c.tokenizer.min_token_chars == 0 {
        return Err(ConfigError::InvalidValue {
            field: "tokenizer.min_token_chars".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if c.storage.wal_compact_threshold == 0 {
        return Err(ConfigError::InvalidValue {
            field: "storage.wal_compact_threshold".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let c = parse_config_toml(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(c.tokenizer.locale, "en");
        assert_eq!(c.tokenizer.min_token_chars, 2);
        assert_eq!(c.storage.wal_compact_threshold, 1000);
    }

    #[test]
    fn default_matches_embedded_toml() {
        let c = TmConfig::default();
        assert_eq!(c.tokenizer.locale, "en");
        assert_eq!(c.storage.wal_compact_threshold, 1000);
    }

    #[test]
    fn parse_valid_custom_toml() {
        let toml = r#"
[tokenizer]
locale = "de"
min_token_chars = 3

[storage]
wal_compact_threshold = 50
"#;
        let c = TmConfig::from_toml_str(toml).unwrap();
        assert_eq!(c.tokenizer.locale, "de");
        assert_eq!(c.tokenizer.min_token_chars, 3);
        assert_eq!(c.storage.wal_compact_threshold, 50);
    }

    #[test]
    fn error_empty_locale() {
        let toml = r#"
[tokenizer]
locale = ""
min_token_chars = 2

[storage]
wal_compact_threshold = 1000
"#;
        let err = TmConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("tokenizer.locale"));
    }

    #[test]
    fn error_zero_min_token_chars() {
        let toml = r#"
[tokenizer]
locale = "en"
min_token_chars = 0

[storage]
wal_compact_threshold = 1000
"#;
        let err = TmConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("min_token_chars"));
    }

    #[test]
    fn error_zero_compact_threshold() {
        let toml = r#"
[tokenizer]
locale = "en"
min_token_chars = 2

[storage]
wal_compact_threshold = 0
"#;
        let err = TmConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("wal_compact_threshold"));
    }

    #[test]
    fn error_invalid_toml() {
        let err = TmConfig::from_toml_str("not valid toml {{{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn error_missing_section() {
        let err = TmConfig::from_toml_str("[tokenizer]\nlocale = \"en\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
