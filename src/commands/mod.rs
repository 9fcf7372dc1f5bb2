//! Subcommand implementations
//!
//! Every command follows the same steps: load the config file, connect,
//! resolve targets, show the plan, confirm, then hand a target operation
//! to the batch engine. The `run_with` functions take the API handle so
//! tests can pass a mock.

pub mod apply;
pub mod delete;
pub mod generate;
pub mod modify;

use anyhow::{Context as _, Result, bail};
use batchkit::{BatchOptions, BatchResult, TargetOperation};
use codesec::{CodeSecurityApi, ConfigurationDetails, GitHubClient, find_by_name};
use std::sync::Arc;

use crate::Context;
use crate::cli::{ExecutionArgs, TargetArgs};
use crate::config::{self, FileConfig};
use crate::dry_run::DryRun;
use crate::progress::TerminalProgress;
use crate::ui;

/// How many target names the plan lists before eliding
const TARGET_PREVIEW: usize = 10;

/// Load the config file named by `--config`, or the default one
pub fn load_config(execution: &ExecutionArgs) -> Result<FileConfig> {
    FileConfig::load(execution.config.as_deref())
}

/// Build the API client from flags, environment and file
pub fn connect(
    target: &TargetArgs,
    file: &FileConfig,
    dry_run: bool,
) -> Result<Arc<dyn CodeSecurityApi>> {
    let token = target
        .token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok());
    if token.is_none() {
        bail!("No token found: pass --token or set GH_TOKEN or GITHUB_TOKEN");
    }

    let host = target
        .hostname
        .as_deref()
        .or(file.target.hostname.as_deref())
        .unwrap_or("github.com");
    log::debug!("Connecting to {host}");

    let client: Arc<dyn CodeSecurityApi> = Arc::new(GitHubClient::for_host(host, token));
    if dry_run {
        Ok(Arc::new(DryRun::new(client)))
    } else {
        Ok(client)
    }
}

/// Enterprise slug from the flag, falling back to the file
pub fn enterprise<'a>(target: &'a TargetArgs, file: &'a FileConfig) -> Option<&'a str> {
    target
        .enterprise
        .as_deref()
        .or(file.target.enterprise.as_deref())
}

/// Configuration name from the flag, falling back to the file
pub fn config_name(flag: Option<&str>, file: &FileConfig) -> Result<String> {
    match flag.or(file.configuration.name.as_deref()) {
        Some(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
        _ => bail!("A configuration name is required: pass --name or set [configuration] name"),
    }
}

/// Check credentials before any organization is touched
pub fn authenticate(api: &dyn CodeSecurityApi) -> Result<String> {
    let user = api
        .current_user()
        .context("Could not determine the authenticated user")?;
    log::info!("Authenticated as {user}");
    Ok(user)
}

/// Find `name` in the first target organization the user owns
pub fn locate(
    api: &dyn CodeSecurityApi,
    targets: &[String],
    name: &str,
) -> Option<(String, ConfigurationDetails)> {
    targets.iter().find_map(|org| {
        if !api.membership(org).is_ok_and(|m| m.is_owner()) {
            return None;
        }
        let configs = api.list_configurations(org).ok()?;
        let id = find_by_name(&configs, name)?;
        match api.configuration_details(org, id) {
            Ok(details) => Some((org.clone(), details)),
            Err(e) => {
                log::debug!("Could not read '{name}' in {org}: {e}");
                None
            }
        }
    })
}

/// Show the execution half of a plan
pub fn show_plan(targets: &[String], options: &BatchOptions, dry_run: bool) {
    ui::kv("Mode", &options.mode.to_string());
    if !options.mode.is_sequential() {
        ui::kv("After a fatal error", options.abort_policy.as_str());
    }
    if dry_run {
        ui::kv("Dry run", "yes, nothing will be changed");
    }
    ui::section(&format!("Organizations ({})", targets.len()));
    ui::targets(targets, TARGET_PREVIEW);
    println!();
}

/// Ask before mutating anything, unless `--yes` or `--dry-run` was given
pub fn confirm(execution: &ExecutionArgs, prompt: &str) -> Result<bool> {
    if execution.yes || execution.dry_run {
        return Ok(true);
    }

    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    if !confirmed {
        ui::info("Cancelled");
    }
    Ok(confirmed)
}

/// Run the batch and print the summary
pub fn execute(
    ctx: &Context,
    verb: &str,
    targets: &[String],
    operation: Arc<dyn TargetOperation>,
    options: &BatchOptions,
) -> BatchResult {
    let mut progress = TerminalProgress::new(ctx.quiet);
    let result = batchkit::run(targets, operation, options, &mut progress);

    ui::summary(verb, &result);
    if !progress.failures().is_empty() && !ctx.quiet {
        ui::section("Failures");
        for (org, error) in progress.failures() {
            ui::kv(org, error);
        }
    }
    result
}

/// Resolve targets and batch options shared by every command
pub fn plan(
    target: &TargetArgs,
    execution: &ExecutionArgs,
    file: &FileConfig,
    api: &dyn CodeSecurityApi,
) -> Result<(Vec<String>, BatchOptions)> {
    let options = config::batch_options(execution, &file.execution)?;
    let targets = crate::targets::resolve(target, enterprise(target, file), api)?;
    Ok((targets, options))
}
