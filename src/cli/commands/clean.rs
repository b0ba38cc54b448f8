//! Clean command - remove staged dependencies

use super::{blocking, build_stager};
use crate::cli::args::CleanArgs;
use crate::config::Project;
use crate::error::StageResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the clean command
pub async fn execute(args: CleanArgs, project: &Project) -> StageResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let stager = build_stager(project, &ctx);

    let targets: Vec<_> = project
        .select_dependencies(&args.names)?
        .into_iter()
        .filter(|dep| dep.canonical_dir().exists() || stager.archive_path(dep).exists())
        .collect();

    if targets.is_empty() {
        ui::step_info(&ctx, "Nothing to clean");
        return Ok(());
    }

    println!("This will remove:");
    for dep in &targets {
        println!("  {} {}", style("•").red(), dep.canonical_dir().display());
    }
    println!();

    if !ui::confirm(&ctx, "Remove staged dependencies?", false).await? {
        ui::step_info(&ctx, "Aborted");
        return Ok(());
    }

    let removed = blocking(move || {
        let mut removed: usize = 0;
        for dep in &targets {
            if stager.clean(dep)? {
                removed += 1;
            }
        }
        Ok(removed)
    })
    .await?;

    ui::step_ok(&ctx, &format!("Removed {} staged dependency dir(s)", removed));
    Ok(())
}
