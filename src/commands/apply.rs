use anyhow::{Result, bail};
use batchkit::BatchResult;
use codesec::CodeSecurityApi;
use std::sync::Arc;

use super::{authenticate, config_name, confirm, execute, locate, plan, show_plan};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::{self, FileConfig};
use crate::operations::Apply;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<Option<BatchResult>> {
    let file = super::load_config(&args.execution)?;
    let api = super::connect(&args.target, &file, args.execution.dry_run)?;
    run_with(ctx, &args, &file, api)
}

pub fn run_with(
    ctx: &Context,
    args: &ApplyArgs,
    file: &FileConfig,
    api: Arc<dyn CodeSecurityApi>,
) -> Result<Option<BatchResult>> {
    authenticate(api.as_ref())?;
    let name = config_name(args.name.as_deref(), file)?;

    let scope = config::parse_scope(args.scope.as_deref().or(file.attach.scope.as_deref()))?;
    let set_default = args.set_default || file.attach.default_for_new_repos.unwrap_or(false);
    if scope.is_none() && !set_default {
        bail!("Nothing to apply: pass --scope, --set-default or both");
    }

    let (targets, options) = plan(&args.target, &args.execution, file, api.as_ref())?;
    let Some((source, details)) = locate(api.as_ref(), &targets, &name) else {
        bail!("Configuration '{name}' not found in any accessible organization");
    };
    ui::info(&format!("Found '{name}' in {source}"));

    ui::header("Apply security configuration");
    ui::kv("Name", &name);
    ui::kv("Description", &details.description);
    ui::kv("Attach to", scope.map_or("no repositories", |s| s.as_str()));
    ui::kv("Default for new repositories", if set_default { "yes" } else { "no" });
    ui::section("Settings");
    ui::settings(&details.settings);
    show_plan(&targets, &options, args.execution.dry_run);

    if !confirm(&args.execution, &format!("Apply '{name}' in these organizations?"))? {
        return Ok(None);
    }

    let operation = Apply::new(api, name, scope, set_default);
    Ok(Some(execute(
        ctx,
        "Application",
        &targets,
        Arc::new(operation),
        &options,
    )))
}
