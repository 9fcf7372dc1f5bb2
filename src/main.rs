mod cli;
mod commands;
mod config;
mod dry_run;
mod operations;
mod progress;
mod targets;
mod ui;

use anyhow::Result;
use batchkit::BatchResult;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    log::trace!("verbosity {}", ctx.verbose);

    let result: Option<BatchResult> = match cli.command {
        Commands::Generate(args) => commands::generate::run(&ctx, args)?,
        Commands::Delete(args) => commands::delete::run(&ctx, args)?,
        Commands::Modify(args) => commands::modify::run(&ctx, args)?,
        Commands::Apply(args) => commands::apply::run(&ctx, args)?,
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "gh-security-config",
                &mut io::stdout(),
            );
            None
        }
    };

    if result.is_some_and(|r| !r.is_success()) {
        std::process::exit(1);
    }
    Ok(())
}
