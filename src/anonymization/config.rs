//! Anonymization configuration

use super::patterns::PatternClass;
use serde::{Deserialize, Serialize};

/// `[anonymization]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Pattern classes to apply after the exact identifier pass
    #[serde(default = "default_enabled_patterns")]
    pub enabled_patterns: Vec<String>,

    /// Shortest name token (in characters) replaced on its own
    #[serde(default = "default_min_name_token_len")]
    pub min_name_token_len: usize,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            enabled_patterns: default_enabled_patterns(),
            min_name_token_len: default_min_name_token_len(),
        }
    }
}

impl AnonymizationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.pattern_classes()?;

        if self.min_name_token_len == 0 {
            return Err("anonymization.min_name_token_len must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Parses `enabled_patterns`
    pub fn pattern_classes(&self) -> Result<Vec<PatternClass>, String> {
        self.enabled_patterns
            .iter()
            .map(|name| name.parse::<PatternClass>())
            .collect()
    }
}

fn default_enabled_patterns() -> Vec<String> {
    PatternClass::ALL
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn default_min_name_token_len() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_every_class() {
        let config = AnonymizationConfig::default();
        assert_eq!(config.pattern_classes().unwrap(), PatternClass::ALL.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_class_rejected() {
        let config = AnonymizationConfig {
            enabled_patterns: vec!["phone".to_string(), "passport".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("passport"));
    }

    #[test]
    fn test_zero_token_len_rejected() {
        let config = AnonymizationConfig {
            min_name_token_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AnonymizationConfig = toml::from_str(r#"enabled_patterns = ["age"]"#).unwrap();
        assert_eq!(config.min_name_token_len, 3);
        assert_eq!(config.pattern_classes().unwrap(), vec![PatternClass::Age]);
    }
}
