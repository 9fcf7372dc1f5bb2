//! Core types for code security configurations.
//!
//! Request bodies, parsed responses and the small vocabulary of setting
//! keys and values the configuration endpoints accept.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Setting keys read from and written to a configuration.
pub const SETTING_KEYS: [&str; 7] = [
    "advanced_security",
    "dependabot_alerts",
    "dependabot_security_updates",
    "secret_scanning",
    "secret_scanning_push_protection",
    "secret_scanning_non_provider_patterns",
    "enforcement",
];

/// Dependabot setting keys with their display names.
///
/// Instances without Dependabot reject these with HTTP 422.
pub const DEPENDABOT_FEATURES: [(&str, &str); 2] = [
    ("dependabot_alerts", "Dependabot Alerts"),
    ("dependabot_security_updates", "Dependabot Security Updates"),
];

/// Setting key to value, e.g. `secret_scanning = "enabled"`.
pub type Settings = BTreeMap<String, String>;

/// Values accepted for a known setting key.
#[must_use]
pub fn allowed_values(key: &str) -> Option<&'static [&'static str]> {
    match key {
        "advanced_security" => Some(&["enabled", "disabled"]),
        "enforcement" => Some(&["enforced", "unenforced"]),
        "dependabot_alerts"
        | "dependabot_security_updates"
        | "secret_scanning"
        | "secret_scanning_push_protection"
        | "secret_scanning_non_provider_patterns" => Some(&["enabled", "disabled", "not_set"]),
        _ => None,
    }
}

/// Check every key and value against the known vocabulary.
pub fn validate_settings(settings: &Settings) -> Result<(), Error> {
    for (key, value) in settings {
        let Some(allowed) = allowed_values(key) else {
            return Err(Error::Other(format!(
                "unknown setting '{}' (expected one of: {})",
                key,
                SETTING_KEYS.join(", ")
            )));
        };
        if !allowed.contains(&value.as_str()) {
            return Err(Error::Other(format!(
                "invalid value '{}' for setting '{}' (expected one of: {})",
                value,
                key,
                allowed.join(", ")
            )));
        }
    }
    Ok(())
}

/// First Dependabot feature the settings actually turn on or enforce.
///
/// `not_set` and `disabled` ask nothing of the instance and never count.
#[must_use]
pub fn requested_dependabot_feature(settings: &Settings) -> Option<&'static str> {
    DEPENDABOT_FEATURES
        .iter()
        .find(|(key, _)| {
            settings
                .get(*key)
                .is_some_and(|v| v != "not_set" && v != "disabled")
        })
        .map(|(_, name)| *name)
}

/// A configuration as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfiguration {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `organization`, `enterprise` or `global`
    #[serde(default)]
    pub target_type: Option<String>,
}

/// A single configuration with its settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigurationDetails {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub target_type: String,
    /// Only the keys in [`SETTING_KEYS`] with string values
    pub settings: Settings,
}

impl ConfigurationDetails {
    /// Extract the details from a raw configuration object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidResponse("configuration is not an object".to_string()))?;

        let id = object
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Error::InvalidResponse("configuration has no id".to_string()))?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };

        let mut settings = Settings::new();
        for key in SETTING_KEYS {
            match object.get(key) {
                Some(serde_json::Value::String(v)) => {
                    settings.insert(key.to_string(), v.clone());
                }
                Some(serde_json::Value::Null) | None => {}
                Some(other) => log::debug!("Ignoring non-string setting {}: {}", key, other),
            }
        }

        Ok(Self {
            id,
            name: text("name").unwrap_or_default(),
            description: text("description").unwrap_or_default(),
            target_type: text("target_type").unwrap_or_else(|| "organization".to_string()),
            settings,
        })
    }

    /// Summary form, as the list endpoint would report it.
    #[must_use]
    pub fn summary(&self) -> SecurityConfiguration {
        SecurityConfiguration {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            target_type: Some(self.target_type.clone()),
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewConfiguration {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub settings: Settings,
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConfigurationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub settings: Settings,
}

impl ConfigurationUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.settings.is_empty()
    }
}

/// Repositories a configuration is attached to.
///
/// # Example
///
/// ```
/// use codesec::AttachScope;
///
/// let scope: AttachScope = "private_or_internal".parse().unwrap();
/// assert_eq!(scope, AttachScope::PrivateOrInternal);
/// assert_eq!(scope.to_string(), "private_or_internal");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachScope {
    All,
    AllWithoutConfigurations,
    Public,
    PrivateOrInternal,
}

impl AttachScope {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::AllWithoutConfigurations => "all_without_configurations",
            Self::Public => "public",
            Self::PrivateOrInternal => "private_or_internal",
        }
    }

    #[must_use]
    pub fn all() -> &'static [AttachScope] {
        &[
            Self::All,
            Self::AllWithoutConfigurations,
            Self::Public,
            Self::PrivateOrInternal,
        ]
    }
}

impl fmt::Display for AttachScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttachScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s.trim().to_lowercase().replace('-', "_"))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::all().iter().map(AttachScope::as_str).collect();
                Error::Other(format!(
                    "unknown attach scope '{}' (expected one of: {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// The authenticated user's standing in an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// No membership, or an invitation that was never accepted
    NotMember,
    /// Active member without the owner role
    Member { role: String },
    /// Active member with the `admin` role
    Owner,
}

impl Membership {
    /// Interpret the `state` and `role` fields of a membership record.
    #[must_use]
    pub fn from_state(state: &str, role: &str) -> Self {
        match (state, role) {
            ("active", "admin") => Self::Owner,
            ("active", role) => Self::Member {
                role: role.to_string(),
            },
            _ => Self::NotMember,
        }
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// Find a configuration id by exact name.
#[must_use]
pub fn find_by_name(configs: &[SecurityConfiguration], name: &str) -> Option<u64> {
    configs.iter().find(|c| c.name == name).map(|c| c.id)
}
