//! Stage command - download and extract declared dependencies

use super::{blocking, build_stager};
use crate::cli::args::StageArgs;
use crate::config::Project;
use crate::error::StageResult;
use crate::stage::{StageOutcome, StageReport};
use crate::ui::{self, UiContext};
use indicatif::HumanBytes;

/// Execute the stage command
pub async fn execute(args: StageArgs, project: &Project) -> StageResult<()> {
    let ctx = UiContext::detect();
    let dependencies = project.select_dependencies(&args.names)?;

    if dependencies.is_empty() {
        ui::step_warn_hint(
            &ctx,
            "No dependencies declared",
            "Add a [[dependency]] table to depstage.toml",
        );
        return Ok(());
    }

    let stager = build_stager(project, &ctx);
    let force = args.force;
    let report_ctx = ctx.clone();

    let staged = blocking(move || {
        let mut staged: usize = 0;
        for dep in &dependencies {
            let outcome = if force {
                stager.restage(dep)?
            } else {
                stager.ensure_staged(dep)?
            };

            let label = format!("{} {}", dep.name(), dep.version());
            match outcome {
                StageOutcome::AlreadyStaged => {
                    ui::step_ok_detail(&report_ctx, &label, "already staged")
                }
                StageOutcome::Staged(report) => {
                    staged += 1;
                    ui::step_ok_detail(&report_ctx, &label, &describe(&report));
                }
            }
        }
        Ok(staged)
    })
    .await?;

    if staged > 0 {
        ui::outro_success(&ctx, &format!("Staged {} dependenc{}", staged, plural(staged)));
    }
    Ok(())
}

fn describe(report: &StageReport) -> String {
    format!("{} files, {}", report.files, HumanBytes(report.bytes))
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}
