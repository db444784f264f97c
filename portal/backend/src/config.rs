//! Portal API configuration

use portal_access::{RuntimeMode, ValidatorConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/portal/portal.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub listen_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub runtime: RuntimeMode,
    pub validator: ValidatorConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            jwt_secret: "portal-secret-key-change-in-production".into(),
            token_ttl_hours: 8,
            runtime: RuntimeMode::Production,
            validator: ValidatorConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Load from a JSON file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// `CONFIG_PATH` file (or defaults) with environment overrides applied
    pub fn from_env() -> Self {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path, error = %e, "Config not found, using defaults");
            Self::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = var("PORTAL_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(secret) = var("PORTAL_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        match var("PORTAL_RUNTIME").as_deref() {
            Some("development") => self.runtime = RuntimeMode::Development,
            Some("production") => self.runtime = RuntimeMode::Production,
            Some(other) => tracing::warn!(value = other, "ignoring unknown PORTAL_RUNTIME"),
            None => {}
        }
    }
}
