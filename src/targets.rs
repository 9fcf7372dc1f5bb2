//! Target resolution
//!
//! Turns `--org`, `--org-list` or `--all-orgs` into the ordered list of
//! organizations a batch runs over. Duplicates are removed here, keeping
//! the first occurrence.

use anyhow::{Context, Result, bail};
use codesec::CodeSecurityApi;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::cli::TargetArgs;
use crate::ui;

static LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,38}$").expect("Invalid login regex")
});

/// Whether `name` looks like an organization login
pub fn is_valid_login(name: &str) -> bool {
    LOGIN.is_match(name)
}

/// Parse organization names from CSV text
///
/// Takes the first column of every line, trims it and drops surrounding
/// quotes. Blank entries are ignored; invalid names are reported and
/// skipped.
pub fn parse_csv(content: &str) -> Vec<String> {
    let mut orgs = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let first = line.split(',').next().unwrap_or_default();
        let name = first.trim().trim_matches('"').trim();
        if name.is_empty() {
            continue;
        }
        if !is_valid_login(name) {
            ui::warn(&format!(
                "Line {}: invalid organization name '{}', skipping",
                index + 1,
                name
            ));
            continue;
        }
        orgs.push(name.to_string());
    }
    orgs
}

pub fn read_csv(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read organization list {}", path.display()))?;
    let orgs = parse_csv(&content);
    if orgs.is_empty() {
        bail!("No valid organizations found in {}", path.display());
    }
    log::info!("Read {} organizations from {}", orgs.len(), path.display());
    Ok(orgs)
}

/// Remove repeated names, keeping the first occurrence
pub fn dedupe(orgs: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    orgs.into_iter()
        .filter(|org| seen.insert(org.to_lowercase()))
        .collect()
}

/// Remove `source` from the targets of a copy
pub fn exclude(orgs: Vec<String>, source: &str) -> Result<Vec<String>> {
    let remaining: Vec<String> = orgs
        .into_iter()
        .filter(|org| !org.eq_ignore_ascii_case(source))
        .collect();
    if remaining.is_empty() {
        bail!("No target organizations left after excluding the source organization '{source}'");
    }
    Ok(remaining)
}

/// Resolve the organizations named by the target flags
pub fn resolve(
    args: &TargetArgs,
    enterprise: Option<&str>,
    api: &dyn CodeSecurityApi,
) -> Result<Vec<String>> {
    let orgs = match (&args.org, &args.org_list, args.all_orgs) {
        (Some(org), None, false) => {
            if !is_valid_login(org) {
                bail!("Invalid organization name '{org}'");
            }
            vec![org.clone()]
        }
        (None, Some(path), false) => {
            let listed = read_csv(path)?;
            match enterprise {
                Some(slug) => within_enterprise(listed, slug, api)?,
                None => listed,
            }
        }
        (None, None, true) => {
            let Some(slug) = enterprise else {
                bail!("--all-orgs requires --enterprise (or [target] enterprise in the config file)");
            };
            enterprise_organizations(slug, api)?
        }
        (None, None, false) => bail!("No targets given: use --org, --org-list or --all-orgs"),
        _ => bail!("Use only one of --org, --org-list or --all-orgs"),
    };

    let orgs = dedupe(orgs);
    if orgs.is_empty() {
        bail!("No organizations to process");
    }
    Ok(orgs)
}

fn enterprise_organizations(slug: &str, api: &dyn CodeSecurityApi) -> Result<Vec<String>> {
    let orgs = api
        .enterprise_organizations(slug)
        .with_context(|| format!("Failed to list organizations of enterprise '{slug}'"))?;
    log::info!("Enterprise {slug} has {} organizations", orgs.len());
    Ok(orgs)
}

/// Keep only the listed organizations that belong to the enterprise
fn within_enterprise(
    listed: Vec<String>,
    slug: &str,
    api: &dyn CodeSecurityApi,
) -> Result<Vec<String>> {
    let members: HashSet<String> = enterprise_organizations(slug, api)?
        .into_iter()
        .map(|org| org.to_lowercase())
        .collect();

    let (valid, unknown): (Vec<String>, Vec<String>) = listed
        .into_iter()
        .partition(|org| members.contains(&org.to_lowercase()));

    if !unknown.is_empty() {
        ui::warn(&format!(
            "{} organizations are not part of enterprise '{}' and will be ignored: {}",
            unknown.len(),
            slug,
            unknown.join(", ")
        ));
    }
    if valid.is_empty() {
        bail!("None of the listed organizations belong to enterprise '{slug}'");
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesec::MockApi;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn csv(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("orgs.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_is_valid_login() {
        assert!(is_valid_login("octo-org"));
        assert!(is_valid_login("Octo_Org2"));
        assert!(!is_valid_login("octo org"));
        assert!(!is_valid_login("octo/org"));
        assert!(!is_valid_login("-octo"));
        assert!(!is_valid_login(&"a".repeat(40)));
    }

    #[test]
    fn test_parse_csv() {
        let orgs = parse_csv("octo-org,extra\n\n  octo-labs  \n\"quoted\"\nbad name\n,\n");
        assert_eq!(orgs, vec!["octo-org", "octo-labs", "quoted"]);
    }

    #[test]
    fn test_read_csv_rejects_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = csv(&dir, "\n  \nbad/name\n");
        assert!(read_csv(&path).is_err());
        assert!(read_csv(&dir.path().join("missing.csv")).is_err());
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let orgs = dedupe(vec![
            "b".to_string(),
            "a".to_string(),
            "B".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(orgs, vec!["b", "a"]);
    }

    #[test]
    fn test_exclude_source() {
        let orgs = vec!["source".to_string(), "target".to_string()];
        assert_eq!(exclude(orgs, "Source").unwrap(), vec!["target"]);
        assert!(exclude(vec!["source".to_string()], "source").is_err());
    }

    #[test]
    fn test_resolve_single_org() {
        let args = TargetArgs {
            org: Some("octo-org".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve(&args, None, &MockApi::new()).unwrap(),
            vec!["octo-org"]
        );
    }

    #[test]
    fn test_resolve_csv_against_enterprise() {
        let dir = TempDir::new().unwrap();
        let mock = MockApi::new();
        mock.add_enterprise("octo-corp", &["octo-org", "octo-labs"]);
        let args = TargetArgs {
            org_list: Some(csv(&dir, "octo-labs\nstranger\nocto-org\nocto-labs\n")),
            ..Default::default()
        };

        let orgs = resolve(&args, Some("octo-corp"), &mock).unwrap();
        assert_eq!(orgs, vec!["octo-labs", "octo-org"]);

        let unchecked = resolve(&args, None, &mock).unwrap();
        assert_eq!(unchecked, vec!["octo-labs", "stranger", "octo-org"]);
    }

    #[test]
    fn test_resolve_csv_with_no_enterprise_members_fails() {
        let dir = TempDir::new().unwrap();
        let mock = MockApi::new();
        mock.add_enterprise("octo-corp", &["octo-org"]);
        let args = TargetArgs {
            org_list: Some(csv(&dir, "stranger\n")),
            ..Default::default()
        };
        assert!(resolve(&args, Some("octo-corp"), &mock).is_err());
    }

    #[test]
    fn test_resolve_all_orgs() {
        let mock = MockApi::new();
        mock.add_enterprise("octo-corp", &["a", "b", "c"]);
        let args = TargetArgs {
            all_orgs: true,
            ..Default::default()
        };

        assert_eq!(resolve(&args, Some("octo-corp"), &mock).unwrap().len(), 3);
        assert!(resolve(&args, None, &mock).is_err());
        assert!(resolve(&args, Some("unknown"), &mock).is_err());
    }

    #[test]
    fn test_resolve_requires_a_source() {
        assert!(resolve(&TargetArgs::default(), None, &MockApi::new()).is_err());
    }
}
