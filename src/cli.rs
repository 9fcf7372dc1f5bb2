use batchkit::AbortPolicy;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gh-security-config")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Create, delete, modify and apply code security configurations across many GitHub organizations",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a security configuration in every target organization
    Generate(GenerateArgs),

    /// Delete a security configuration from every target organization
    Delete(DeleteArgs),

    /// Update an existing security configuration in every target organization
    Modify(ModifyArgs),

    /// Attach an existing security configuration to repositories
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

/// Which organizations to target and how to reach them
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target a single organization
    #[arg(long, conflicts_with_all = ["org_list", "all_orgs"])]
    pub org: Option<String>,

    /// CSV file with one organization per line (first column, no header)
    #[arg(long, value_name = "CSV", conflicts_with = "all_orgs")]
    pub org_list: Option<PathBuf>,

    /// Target every organization in the enterprise
    #[arg(long)]
    pub all_orgs: bool,

    /// Enterprise slug (required by --all-orgs, validates --org-list)
    #[arg(long, value_name = "SLUG")]
    pub enterprise: Option<String>,

    /// GitHub Enterprise Server or GHE.com hostname
    #[arg(long, env = "GH_HOST")]
    pub hostname: Option<String>,

    /// API token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// How the batch runs
#[derive(Args, Debug, Clone, Default)]
pub struct ExecutionArgs {
    /// Number of organizations processed in parallel (1-20)
    #[arg(long, conflicts_with = "delay")]
    pub concurrency: Option<usize>,

    /// Seconds to wait between organizations (1-600); processes one at a time
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<u64>,

    /// What to do with in-flight results after a fatal error: discard or fold-in
    #[arg(long, value_name = "POLICY")]
    pub abort_policy: Option<AbortPolicy>,

    /// Config file (TOML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be done without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Security settings given on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Security setting as KEY=VALUE (repeatable), e.g. secret_scanning=enabled
    #[arg(long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Whether Dependabot Alerts is available on this instance
    #[arg(long, value_name = "BOOL")]
    pub dependabot_alerts_available: Option<bool>,

    /// Whether Dependabot Security Updates is available on this instance
    #[arg(long, value_name = "BOOL")]
    pub dependabot_security_updates_available: Option<bool>,
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Configuration name
    #[arg(long)]
    pub name: Option<String>,

    /// Configuration description
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Repositories to attach to: all, all_without_configurations, public,
    /// private_or_internal, or none
    #[arg(long)]
    pub scope: Option<String>,

    /// Make the configuration the default for new repositories
    #[arg(long)]
    pub set_default: bool,

    /// Delete an existing configuration with the same name first
    #[arg(long)]
    pub force: bool,

    /// Copy name, description and settings from a configuration in this organization
    #[arg(long, value_name = "ORG")]
    pub copy_from_org: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeleteArgs {
    /// Name of the configuration to delete
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ModifyArgs {
    /// Name of the configuration to modify
    #[arg(long)]
    pub name: Option<String>,

    /// Rename the configuration
    #[arg(long)]
    pub new_name: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApplyArgs {
    /// Name of the configuration to apply
    #[arg(long)]
    pub name: Option<String>,

    /// Repositories to attach to: all, all_without_configurations, public,
    /// or private_or_internal
    #[arg(long)]
    pub scope: Option<String>,

    /// Make the configuration the default for new repositories
    #[arg(long)]
    pub set_default: bool,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub execution: ExecutionArgs,
}
