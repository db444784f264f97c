//! CLI Configuration

use crate::output::OutputFormat;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub default_format: Option<String>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self, String> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| e.to_string())?;
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf, String> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, content).map_err(|e| e.to_string())?;
        Ok(path)
    }

    /// Configured output format, table when unset or unrecognised
    pub fn format(&self) -> OutputFormat {
        self.default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or(OutputFormat::Table)
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf, String> {
        let home = dirs::home_dir().ok_or("Cannot find home directory")?;
        Ok(home.join(".portal").join(file_name(profile)))
    }
}

fn file_name(profile: Option<&str>) -> String {
    match profile {
        Some(p) => format!("config.{}.toml", p),
        None => "config.toml".to_string(),
    }
}

/// Mask a secret for display
pub fn mask(secret: &str) -> String {
    format!("{}****", secret.chars().take(8).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_file_names() {
        assert_eq!(file_name(None), "config.toml");
        assert_eq!(file_name(Some("staging")), "config.staging.toml");
    }

    #[test]
    fn test_format_fallback() {
        let mut config = Config::default();
        assert!(matches!(config.format(), OutputFormat::Table));
        config.default_format = Some("YAML".into());
        assert!(matches!(config.format(), OutputFormat::Yaml));
        config.default_format = Some("xml".into());
        assert!(matches!(config.format(), OutputFormat::Table));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            api_url: Some("http://localhost:8080".into()),
            token: Some("abc".into()),
            default_format: None,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("eyJhbGciOiJIUzI1NiJ9"), "eyJhbGci****");
        assert_eq!(mask("abc"), "abc****");
        assert_eq!(mask("clé-secrète-longue"), "clé-secr****");
    }
}
