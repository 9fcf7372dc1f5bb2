use anyhow::Result;
use batchkit::BatchResult;
use codesec::CodeSecurityApi;
use std::sync::Arc;

use super::{authenticate, config_name, confirm, execute, plan, show_plan};
use crate::Context;
use crate::cli::DeleteArgs;
use crate::config::FileConfig;
use crate::operations::Delete;
use crate::ui;

pub fn run(ctx: &Context, args: DeleteArgs) -> Result<Option<BatchResult>> {
    let file = super::load_config(&args.execution)?;
    let api = super::connect(&args.target, &file, args.execution.dry_run)?;
    run_with(ctx, &args, &file, api)
}

pub fn run_with(
    ctx: &Context,
    args: &DeleteArgs,
    file: &FileConfig,
    api: Arc<dyn CodeSecurityApi>,
) -> Result<Option<BatchResult>> {
    authenticate(api.as_ref())?;
    let name = config_name(args.name.as_deref(), file)?;
    let (targets, options) = plan(&args.target, &args.execution, file, api.as_ref())?;

    ui::header("Delete security configuration");
    ui::kv("Name", &name);
    ui::warn("Repositories using this configuration will be left without one");
    show_plan(&targets, &options, args.execution.dry_run);

    if !confirm(&args.execution, &format!("Delete '{name}' from these organizations?"))? {
        return Ok(None);
    }

    let operation = Delete::new(api, name);
    Ok(Some(execute(
        ctx,
        "Deletion",
        &targets,
        Arc::new(operation),
        &options,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ExecutionArgs, TargetArgs};
    use crate::commands::tests::{mock_with_baseline, quiet};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_delete_across_csv_list() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("orgs.csv");
        fs::write(&csv, "a\nb\nmissing\n").unwrap();
        let mock = mock_with_baseline(&["a", "b"]);

        let args = DeleteArgs {
            name: Some("baseline".to_string()),
            target: TargetArgs {
                org_list: Some(csv),
                ..Default::default()
            },
            execution: ExecutionArgs {
                concurrency: Some(3),
                yes: true,
                ..Default::default()
            },
        };

        let result = run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(result.success, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 0);
        assert!(mock.org("a").unwrap().configurations.is_empty());
        assert!(mock.org("b").unwrap().configurations.is_empty());
    }

    #[test]
    fn test_delete_requires_name() {
        let args = DeleteArgs {
            target: TargetArgs {
                org: Some("a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mock = mock_with_baseline(&["a"]);
        assert!(run_with(&quiet(), &args, &FileConfig::default(), Arc::new(mock)).is_err());
    }
}
