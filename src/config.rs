//! Config file loading and merging with command-line flags
//!
//! The file is optional. Flags always win over file values.
//!
//! ```toml
//! [configuration]
//! name = "baseline"
//! description = "Org-wide secret scanning"
//!
//! [settings]
//! secret_scanning = "enabled"
//! secret_scanning_push_protection = "enabled"
//!
//! [attach]
//! scope = "all"
//! default_for_new_repos = true
//!
//! [execution]
//! concurrency = 5
//! abort_policy = "discard"
//!
//! [target]
//! enterprise = "octo-corp"
//! hostname = "github.example.com"
//! ```

use anyhow::{Context, Result, bail};
use batchkit::{AbortPolicy, BatchOptions, ExecutionMode};
use codesec::{AttachScope, DEPENDABOT_FEATURES, Settings, validate_settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{ExecutionArgs, SettingsArgs};

/// Get the config directory path, if there is a home directory
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("gh-security-config"))
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => bail!(
                "Unsupported config format for {} (expected .toml or .json)",
                path.display()
            ),
        }
    }

    fn parse(self, content: &str, path: &Path) -> Result<FileConfig> {
        match self {
            Self::Toml => toml::from_str(content)
                .with_context(|| format!("Invalid TOML in {}", path.display())),
            Self::Json => serde_json::from_str(content)
                .with_context(|| format!("Invalid JSON in {}", path.display())),
        }
    }
}

// ============================================================================
// File Config
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub configuration: ConfigurationSection,
    pub settings: Settings,
    pub attach: AttachSection,
    pub execution: ExecutionSection,
    pub target: TargetSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigurationSection {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachSection {
    /// Attach scope, or "none"
    pub scope: Option<String>,
    pub default_for_new_repos: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSection {
    pub concurrency: Option<usize>,
    pub delay: Option<u64>,
    pub abort_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSection {
    pub enterprise: Option<String>,
    pub hostname: Option<String>,
}

impl FileConfig {
    /// Load an explicit config file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
            None => return Self::load_default(config_dir().map(|dir| dir.join("config.toml"))),
        };
        Self::load_from(&path)
    }

    /// Load the default file when there is one; no file means empty config
    fn load_default(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                log::debug!("No config file at {}", path.display());
                Ok(Self::default())
            }
            None => {
                log::debug!("No home directory, skipping the default config file");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = format.parse(&content, path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Batch options from flags, falling back to the file.
///
/// Flags that pick a mode replace the file's mode entirely.
pub fn batch_options(args: &ExecutionArgs, file: &ExecutionSection) -> Result<BatchOptions> {
    let (concurrency, delay) = if args.concurrency.is_some() || args.delay.is_some() {
        (args.concurrency, args.delay)
    } else {
        (file.concurrency, file.delay)
    };
    let mode = ExecutionMode::from_flags(concurrency, delay)?;

    let abort_policy = match (args.abort_policy, &file.abort_policy) {
        (Some(policy), _) => policy,
        (None, Some(name)) => name.parse::<AbortPolicy>()?,
        (None, None) => AbortPolicy::default(),
    };

    Ok(BatchOptions { mode, abort_policy })
}

/// Attach scope from a flag or file value; "none" means no attachment.
pub fn parse_scope(value: Option<&str>) -> Result<Option<AttachScope>> {
    match value.map(str::trim) {
        None | Some("none") => Ok(None),
        Some(scope) => Ok(Some(scope.parse()?)),
    }
}

/// Settings a new configuration gets when none are given
pub fn default_settings() -> Settings {
    [
        ("advanced_security", "enabled"),
        ("secret_scanning", "enabled"),
        ("secret_scanning_push_protection", "enabled"),
        ("secret_scanning_non_provider_patterns", "disabled"),
        ("enforcement", "enforced"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Parse `KEY=VALUE` pairs on top of `base`
pub fn merge_settings(base: &Settings, pairs: &[String]) -> Result<Settings> {
    let mut settings = base.clone();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid setting '{}' (expected KEY=VALUE)", pair);
        };
        settings.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(settings)
}

/// Remove Dependabot settings for features declared unavailable.
///
/// Returns the removed keys.
pub fn drop_unavailable_features(
    settings: &mut Settings,
    alerts_available: Option<bool>,
    updates_available: Option<bool>,
) -> Vec<String> {
    let mut removed = Vec::new();
    for ((key, _), available) in DEPENDABOT_FEATURES
        .iter()
        .zip([alerts_available, updates_available])
    {
        if available == Some(false) && settings.remove(*key).is_some() {
            removed.push((*key).to_string());
        }
    }
    removed
}

/// Merge flag settings over `base`, drop unavailable features, validate.
pub fn resolve_settings(base: &Settings, args: &SettingsArgs) -> Result<Settings> {
    let mut settings = merge_settings(base, &args.settings)?;
    for key in drop_unavailable_features(
        &mut settings,
        args.dependabot_alerts_available,
        args.dependabot_security_updates_available,
    ) {
        crate::ui::warn(&format!(
            "Dropping '{key}': the feature was declared unavailable"
        ));
    }
    validate_settings(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.toml",
            r#"
[configuration]
name = "baseline"

[settings]
secret_scanning = "enabled"

[attach]
scope = "public"
default_for_new_repos = true

[execution]
delay = 30

[target]
enterprise = "octo-corp"
"#,
        );

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.configuration.name.as_deref(), Some("baseline"));
        assert_eq!(config.settings["secret_scanning"], "enabled");
        assert_eq!(config.attach.scope.as_deref(), Some("public"));
        assert_eq!(config.attach.default_for_new_repos, Some(true));
        assert_eq!(config.execution.delay, Some(30));
        assert_eq!(config.target.enterprise.as_deref(), Some("octo-corp"));
    }

    #[test]
    fn test_default_file_is_optional() {
        let config = FileConfig::load_default(None).unwrap();
        assert!(config.configuration.name.is_none());
        assert!(config.settings.is_empty());

        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("config.toml");
        assert!(FileConfig::load_default(Some(missing.clone())).unwrap().settings.is_empty());

        write(&dir, "config.toml", "[configuration]\nname = \"baseline\"\n");
        let config = FileConfig::load_default(Some(missing)).unwrap();
        assert_eq!(config.configuration.name.as_deref(), Some("baseline"));
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"configuration": {"name": "baseline"}, "execution": {"concurrency": 4}}"#,
        );

        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.configuration.name.as_deref(), Some("baseline"));
        assert_eq!(config.execution.concurrency, Some(4));
    }

    #[test]
    fn test_load_rejects_unknown_sections_and_formats() {
        let dir = TempDir::new().unwrap();
        let typo = write(&dir, "config.toml", "[executon]\nconcurrency = 2\n");
        assert!(FileConfig::load_from(&typo).is_err());

        let yaml = write(&dir, "config.yaml", "execution: {}\n");
        assert!(FileConfig::load_from(&yaml).is_err());

        assert!(FileConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_batch_options_flags_override_file() {
        let file = ExecutionSection {
            concurrency: None,
            delay: Some(30),
            abort_policy: Some("fold-in".to_string()),
        };

        let from_file = batch_options(&ExecutionArgs::default(), &file).unwrap();
        assert_eq!(
            from_file.mode,
            ExecutionMode::Sequential {
                delay: Duration::from_secs(30)
            }
        );
        assert_eq!(from_file.abort_policy, AbortPolicy::FoldIn);

        let args = ExecutionArgs {
            concurrency: Some(8),
            abort_policy: Some(AbortPolicy::Discard),
            ..Default::default()
        };
        let from_flags = batch_options(&args, &file).unwrap();
        assert_eq!(from_flags.mode, ExecutionMode::Concurrent { workers: 8 });
        assert_eq!(from_flags.abort_policy, AbortPolicy::Discard);
    }

    #[test]
    fn test_batch_options_validation() {
        let args = ExecutionArgs {
            concurrency: Some(21),
            ..Default::default()
        };
        assert!(batch_options(&args, &ExecutionSection::default()).is_err());

        let file = ExecutionSection {
            delay: Some(601),
            ..Default::default()
        };
        assert!(batch_options(&ExecutionArgs::default(), &file).is_err());

        let defaults = batch_options(&ExecutionArgs::default(), &ExecutionSection::default()).unwrap();
        assert_eq!(defaults.mode, ExecutionMode::Concurrent { workers: 1 });
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope(None).unwrap(), None);
        assert_eq!(parse_scope(Some("none")).unwrap(), None);
        assert_eq!(parse_scope(Some("all")).unwrap(), Some(AttachScope::All));
        assert!(parse_scope(Some("everything")).is_err());
    }

    #[test]
    fn test_merge_settings() {
        let merged = merge_settings(
            &default_settings(),
            &["secret_scanning = disabled".to_string(), "dependabot_alerts=enabled".to_string()],
        )
        .unwrap();
        assert_eq!(merged["secret_scanning"], "disabled");
        assert_eq!(merged["dependabot_alerts"], "enabled");
        assert_eq!(merged["enforcement"], "enforced");

        assert!(merge_settings(&Settings::new(), &["secret_scanning".to_string()]).is_err());
    }

    #[test]
    fn test_drop_unavailable_features() {
        let mut settings = merge_settings(
            &Settings::new(),
            &[
                "dependabot_alerts=enabled".to_string(),
                "dependabot_security_updates=enabled".to_string(),
            ],
        )
        .unwrap();

        let removed = drop_unavailable_features(&mut settings, Some(false), Some(true));
        assert_eq!(removed, vec!["dependabot_alerts".to_string()]);
        assert!(!settings.contains_key("dependabot_alerts"));
        assert!(settings.contains_key("dependabot_security_updates"));

        assert!(drop_unavailable_features(&mut settings, None, None).is_empty());
    }

    #[test]
    fn test_resolve_settings_validates() {
        let args = SettingsArgs {
            settings: vec!["secret_scanning=on".to_string()],
            ..Default::default()
        };
        assert!(resolve_settings(&Settings::new(), &args).is_err());

        let args = SettingsArgs {
            settings: vec!["dependabot_alerts=enabled".to_string()],
            dependabot_alerts_available: Some(false),
            ..Default::default()
        };
        let settings = resolve_settings(&default_settings(), &args).unwrap();
        assert!(!settings.contains_key("dependabot_alerts"));
    }
}
