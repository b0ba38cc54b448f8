//! Run command - execute a task and its prerequisites

use super::{blocking, build_stager};
use crate::cli::args::RunArgs;
use crate::config::Project;
use crate::error::StageResult;
use crate::stage::StageOutcome;
use crate::tasks::{build_graph, TaskOutcome};
use crate::ui::{self, UiContext};

/// Execute the run command
pub async fn execute(args: RunArgs, project: &Project) -> StageResult<()> {
    let ctx = UiContext::detect();
    let graph = build_graph(project)?;
    let stager = build_stager(project, &ctx);

    let target = args.task.clone();
    let report_ctx = ctx.clone();
    let results = blocking(move || {
        graph.run(&target, &stager, |name, outcome| {
            report(&report_ctx, name, outcome)
        })
    })
    .await?;

    ui::outro_success(
        &ctx,
        &format!("{} finished ({} tasks)", args.task, results.len()),
    );
    Ok(())
}

fn report(ctx: &UiContext, name: &str, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Aggregate => ui::remark(ctx, name),
        TaskOutcome::Staged(StageOutcome::AlreadyStaged) => {
            ui::step_ok_detail(ctx, name, "up to date")
        }
        TaskOutcome::Staged(StageOutcome::Staged(report)) => {
            ui::step_ok_detail(ctx, name, &format!("{} files extracted", report.files))
        }
        TaskOutcome::Command => ui::step_ok(ctx, name),
    }
}
