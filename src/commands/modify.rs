use anyhow::{Result, bail};
use batchkit::BatchResult;
use codesec::{CodeSecurityApi, ConfigurationUpdate, Settings};
use std::sync::Arc;

use super::{authenticate, config_name, confirm, execute, locate, plan, show_plan};
use crate::Context;
use crate::cli::ModifyArgs;
use crate::config::{self, FileConfig};
use crate::operations::Modify;
use crate::ui;

pub fn run(ctx: &Context, args: ModifyArgs) -> Result<Option<BatchResult>> {
    let file = super::load_config(&args.execution)?;
    let api = super::connect(&args.target, &file, args.execution.dry_run)?;
    run_with(ctx, &args, &file, api)
}

pub fn run_with(
    ctx: &Context,
    args: &ModifyArgs,
    file: &FileConfig,
    api: Arc<dyn CodeSecurityApi>,
) -> Result<Option<BatchResult>> {
    authenticate(api.as_ref())?;
    let name = config_name(args.name.as_deref(), file)?;
    let (targets, options) = plan(&args.target, &args.execution, file, api.as_ref())?;

    let update = ConfigurationUpdate {
        name: args.new_name.clone().filter(|n| *n != name),
        description: args.description.clone(),
        settings: config::resolve_settings(&file.settings, &args.settings)?,
    };
    if update.is_empty() {
        bail!("Nothing to modify: pass --new-name, --description or --setting");
    }

    let Some((source, current)) = locate(api.as_ref(), &targets, &name) else {
        bail!("Configuration '{name}' not found in any accessible organization");
    };

    ui::header("Modify security configuration");
    ui::kv("Name", &name);
    ui::kv("Current settings from", &source);
    if let Some(new_name) = &update.name {
        ui::kv("New name", new_name);
    }
    if let Some(description) = &update.description {
        ui::kv("Description", &format!("{} -> {}", current.description, description));
    }
    ui::section("Settings");
    ui::settings(&changed_settings(&current.settings, &update.settings));
    show_plan(&targets, &options, args.execution.dry_run);

    if !confirm(&args.execution, &format!("Update '{name}' in these organizations?"))? {
        return Ok(None);
    }

    let operation = Modify::new(api, name, update);
    Ok(Some(execute(
        ctx,
        "Modification",
        &targets,
        Arc::new(operation),
        &options,
    )))
}

/// The settings an update changes, as `old -> new`
fn changed_settings(current: &Settings, update: &Settings) -> Settings {
    update
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(value))
        .map(|(key, value)| {
            let old = current.get(key).map_or("not_set", String::as_str);
            (key.clone(), format!("{old} -> {value}"))
        })
        .collect()
}
