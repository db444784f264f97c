//! Portal Data Model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Signed-in user ID
pub type ActorId = Uuid;

/// Client account identifier ("SID")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(String);

impl Sid {
    /// Wrap a raw identifier, rejecting blank input
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Sid {
    fn from(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }
}

/// Account status as stored on the settings row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingStatus {
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl SettingStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SettingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// Client account ("setting") row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: Uuid,
    pub sid: Sid,
    pub account_name: String,
    pub package: String,
    pub status: SettingStatus,
}

impl Setting {
    pub fn new(sid: Sid, account_name: &str, package: &str, status: SettingStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            sid,
            account_name: account_name.to_string(),
            package: package.to_string(),
            status,
        }
    }
}

/// CRM view of a client account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmClient {
    pub id: Uuid,
    pub sid: Sid,
    pub account_name: String,
    pub package: String,
    pub marketing_plan_url: Option<String>,
    pub brand_guidelines_url: Option<String>,
    pub brand_templates_url: Option<String>,
}

impl CrmClient {
    pub fn for_setting(setting: &Setting) -> Self {
        Self {
            id: Uuid::new_v4(),
            sid: setting.sid.clone(),
            account_name: setting.account_name.clone(),
            package: setting.package.clone(),
            marketing_plan_url: None,
            brand_guidelines_url: None,
            brand_templates_url: None,
        }
    }
}

/// Portal role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Agency staff, full access
    Agency,
    /// Client user, permission-checked
    Client,
}

/// Portal account used for sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub actor_id: ActorId,
    pub email: String,
    /// Hex-encoded SHA-256 of the password
    pub password_digest: String,
    pub role: Role,
}

/// Per-client portal preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub notification_preferences: NotificationPreferences,
    pub display_preferences: DisplayPreferences,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            notification_preferences: NotificationPreferences {
                email: true,
                sms: false,
                push: false,
            },
            display_preferences: DisplayPreferences {
                theme: Theme::System,
                language: "en".into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPreferences {
    pub theme: Theme,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_parse() {
        assert_eq!(Sid::parse("  SID-42 ").unwrap().as_str(), "SID-42");
        assert!(Sid::parse("   ").is_none());
        assert!(Sid::parse("").is_none());
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert!(config.notification_preferences.email);
        assert!(!config.notification_preferences.sms);
        assert_eq!(config.display_preferences.theme, Theme::System);
        assert_eq!(config.display_preferences.language, "en");
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&SettingStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
        assert!(SettingStatus::Active.is_active());
        assert!(!SettingStatus::Suspended.is_active());
    }
}
