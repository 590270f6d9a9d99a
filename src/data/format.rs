use crate::error::{BiletoError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Serialization format of export bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    #[default]
    Json,
    Yaml,
}

impl DataFormat {
    /// Detect format from content
    pub fn detect(content: &str) -> Result<Self> {
        let trimmed = content.trim();

        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<Value>(trimmed).is_ok()
        {
            return Ok(Self::Json);
        }

        // Scalars are valid YAML too, only mappings make a bundle
        if matches!(
            serde_yaml::from_str::<serde_yaml::Value>(trimmed),
            Ok(serde_yaml::Value::Mapping(_))
        ) {
            return Ok(Self::Yaml);
        }

        Err(BiletoError::InvalidInput(
            "Unable to detect format. Content must be valid JSON or YAML".to_string(),
        ))
    }

    pub fn serialize<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Json => serde_json::to_string_pretty(value)?,
            Self::Yaml => serde_yaml::to_string(value)?,
        })
    }

    pub fn deserialize<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| BiletoError::ParseError(format!("Invalid JSON: {e}"))),
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| BiletoError::ParseError(format!("Invalid YAML: {e}"))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

impl FromStr for DataFormat {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid format: {s}. Must be one of: json, yaml"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(DataFormat::detect("  {\"version\": 1}").unwrap(), DataFormat::Json);
        assert_eq!(DataFormat::detect("version: 1\nusers: []\n").unwrap(), DataFormat::Yaml);
        assert!(DataFormat::detect("just some text").is_err());
        assert!(DataFormat::detect("{ broken").is_err());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("YML".parse::<DataFormat>().unwrap(), DataFormat::Yaml);
        assert!("csv".parse::<DataFormat>().is_err());
    }
}
