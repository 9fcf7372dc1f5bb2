use anyhow::{Context as _, Result, bail};
use batchkit::BatchResult;
use codesec::{CodeSecurityApi, Membership, NewConfiguration, find_by_name};
use std::sync::Arc;

use super::{authenticate, config_name, confirm, execute, plan, show_plan};
use crate::Context;
use crate::cli::GenerateArgs;
use crate::config::{self, FileConfig};
use crate::operations::Generate;
use crate::targets;
use crate::ui;

pub fn run(ctx: &Context, args: GenerateArgs) -> Result<Option<BatchResult>> {
    let file = super::load_config(&args.execution)?;
    let api = super::connect(&args.target, &file, args.execution.dry_run)?;
    run_with(ctx, &args, &file, api)
}

pub fn run_with(
    ctx: &Context,
    args: &GenerateArgs,
    file: &FileConfig,
    api: Arc<dyn CodeSecurityApi>,
) -> Result<Option<BatchResult>> {
    authenticate(api.as_ref())?;

    let (mut targets, options) = plan(&args.target, &args.execution, file, api.as_ref())?;
    let config = match &args.copy_from_org {
        Some(source) => {
            targets = targets::exclude(targets, source)?;
            copy_from(api.as_ref(), source, args, file)?
        }
        None => new_configuration(args, file)?,
    };

    let scope = config::parse_scope(args.scope.as_deref().or(file.attach.scope.as_deref()))?;
    let set_default = args.set_default || file.attach.default_for_new_repos.unwrap_or(false);

    ui::header("Generate security configuration");
    ui::kv("Name", &config.name);
    ui::kv("Description", &config.description);
    ui::kv("Attach to", scope.map_or("no repositories", |s| s.as_str()));
    ui::kv("Default for new repositories", if set_default { "yes" } else { "no" });
    if args.force {
        ui::kv("Existing configuration", "replaced");
    }
    ui::section("Settings");
    ui::settings(&config.settings);
    show_plan(&targets, &options, args.execution.dry_run);

    if !confirm(&args.execution, "Create the configuration in these organizations?")? {
        return Ok(None);
    }

    let operation = Generate::new(api, config)
        .attach(scope, set_default)
        .force(args.force);
    Ok(Some(execute(
        ctx,
        "Generation",
        &targets,
        Arc::new(operation),
        &options,
    )))
}

fn new_configuration(args: &GenerateArgs, file: &FileConfig) -> Result<NewConfiguration> {
    let name = config_name(args.name.as_deref(), file)?;
    let description = args
        .description
        .clone()
        .or_else(|| file.configuration.description.clone())
        .unwrap_or_else(|| name.clone());

    let base = if file.settings.is_empty() {
        config::default_settings()
    } else {
        file.settings.clone()
    };
    let settings = config::resolve_settings(&base, &args.settings)?;

    Ok(NewConfiguration {
        name,
        description,
        settings,
    })
}

/// Take name, description and settings from a configuration in `source`
fn copy_from(
    api: &dyn CodeSecurityApi,
    source: &str,
    args: &GenerateArgs,
    file: &FileConfig,
) -> Result<NewConfiguration> {
    let name = config_name(args.name.as_deref(), file)?;
    match api
        .membership(source)
        .with_context(|| format!("Failed to check membership in source organization '{source}'"))?
    {
        Membership::Owner => {}
        Membership::NotMember => {
            bail!("You are not a member of source organization '{source}'")
        }
        Membership::Member { role } => {
            bail!("You must be an owner of source organization '{source}' to copy from it (role: {role})")
        }
    }

    let configs = api
        .list_configurations(source)
        .with_context(|| format!("Failed to list configurations in '{source}'"))?;
    let Some(id) = find_by_name(&configs, &name) else {
        bail!("Configuration '{name}' not found in source organization '{source}'");
    };
    let details = api
        .configuration_details(source, id)
        .with_context(|| format!("Failed to read '{name}' from '{source}'"))?;
    ui::info(&format!("Copying '{}' from {}", details.name, source));

    let settings = config::resolve_settings(&details.settings, &args.settings)?;
    Ok(NewConfiguration {
        name: details.name,
        description: args.description.clone().unwrap_or(details.description),
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ExecutionArgs, TargetArgs};
    use crate::commands::tests::{mock_with_baseline, quiet};
    use codesec::{AttachScope, Call, Membership, MockApi};

    fn args(org: &str) -> GenerateArgs {
        GenerateArgs {
            name: Some("baseline".to_string()),
            scope: Some("all".to_string()),
            target: TargetArgs {
                org: Some(org.to_string()),
                ..Default::default()
            },
            execution: ExecutionArgs {
                yes: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_with_default_settings() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);

        let result = run_with(&quiet(), &args("octo-org"), &FileConfig::default(), Arc::new(mock.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(result.success, 1);

        let org = mock.org("octo-org").unwrap();
        let config = &org.configurations[0];
        assert_eq!(config.description, "baseline");
        assert_eq!(config.settings["secret_scanning_push_protection"], "enabled");
        assert_eq!(org.attachments, vec![(config.id, AttachScope::All)]);
        assert_eq!(org.default_configuration, None);
    }

    #[test]
    fn test_file_settings_and_defaults() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);
        let mut file = FileConfig::default();
        file.settings
            .insert("secret_scanning".to_string(), "disabled".to_string());
        file.attach.default_for_new_repos = Some(true);

        let mut args = args("octo-org");
        args.scope = None;
        run_with(&quiet(), &args, &file, Arc::new(mock.clone())).unwrap();

        let org = mock.org("octo-org").unwrap();
        let config = &org.configurations[0];
        assert_eq!(config.settings.len(), 1);
        assert_eq!(config.settings["secret_scanning"], "disabled");
        assert!(org.attachments.is_empty());
        assert_eq!(org.default_configuration, Some(config.id));
    }

    #[test]
    fn test_copy_from_org() {
        let mock = mock_with_baseline(&["source"]);
        mock.add_org("target", Membership::Owner);
        let mut args = args("ignored");
        args.target = TargetArgs {
            all_orgs: true,
            enterprise: Some("octo-corp".to_string()),
            ..Default::default()
        };
        args.copy_from_org = Some("source".to_string());
        mock.add_enterprise("octo-corp", &["source", "target"]);

        let result = run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(result.total(), 1);
        assert_eq!(result.success, 1);

        let copied = &mock.org("target").unwrap().configurations[0];
        assert_eq!(copied.name, "baseline");
        assert_eq!(copied.description, "baseline description");
        assert_eq!(copied.settings["secret_scanning"], "enabled");
        assert_eq!(mock.calls_to(Call::Create), vec!["target".to_string()]);
    }

    #[test]
    fn test_copy_from_missing_configuration_fails() {
        let mock = MockApi::new();
        mock.add_org("source", Membership::Owner);
        mock.add_enterprise("octo-corp", &["source", "target"]);
        let mut args = args("ignored");
        args.target = TargetArgs {
            all_orgs: true,
            enterprise: Some("octo-corp".to_string()),
            ..Default::default()
        };
        args.copy_from_org = Some("source".to_string());

        assert!(run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock)).is_err());
    }

    #[test]
    fn test_invalid_setting_fails_before_running() {
        let mock = MockApi::new();
        mock.add_org("octo-org", Membership::Owner);
        let mut args = args("octo-org");
        args.settings.settings = vec!["secret_scanning=maybe".to_string()];

        assert!(run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock.clone())).is_err());
        assert!(mock.calls_to(Call::Create).is_empty());
    }

    fn copy_args() -> GenerateArgs {
        let mut args = args("ignored");
        args.target = TargetArgs {
            all_orgs: true,
            enterprise: Some("octo-corp".to_string()),
            ..Default::default()
        };
        args.copy_from_org = Some("source".to_string());
        args
    }

    #[test]
    fn test_copy_from_requires_source_owner() {
        let mock = MockApi::new();
        mock.add_org(
            "source",
            Membership::Member {
                role: "member".to_string(),
            },
        );
        mock.add_configuration("source", "baseline", &[]);
        mock.add_org("target", Membership::Owner);
        mock.add_enterprise("octo-corp", &["source", "target"]);

        let err = run_with(&quiet(), &copy_args(), &FileConfig::default(), Arc::new(mock.clone()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("owner of source organization 'source'"), "{err}");
        assert!(mock.calls_to(Call::List).is_empty());
        assert!(mock.calls_to(Call::Create).is_empty());
    }

    #[test]
    fn test_copy_from_unknown_source_fails() {
        let mock = MockApi::new();
        mock.add_org("target", Membership::Owner);
        mock.add_enterprise("octo-corp", &["target"]);
        let mut args = copy_args();
        args.copy_from_org = Some("elsewhere".to_string());

        let err = run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock.clone()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("not a member of source organization 'elsewhere'"), "{err}");
        assert!(mock.calls_to(Call::List).is_empty());
    }
}
