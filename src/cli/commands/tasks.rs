//! Tasks command - list the task graph

use crate::config::Project;
use crate::error::StageResult;
use crate::tasks::{build_graph, Task, TaskAction};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the tasks command
pub async fn execute(project: &Project) -> StageResult<()> {
    let ctx = UiContext::detect();
    let graph = build_graph(project)?;

    ui::intro(&ctx, "Tasks");

    println!(
        "{:<28} {:<28} {}",
        style("TASK").bold(),
        style("DEPENDS ON").bold(),
        style("ACTION").bold()
    );
    println!("{}", "-".repeat(80));

    for task in graph.tasks() {
        let depends_on = if task.dependencies().is_empty() {
            "-".to_string()
        } else {
            task.dependencies().join(", ")
        };
        println!("{:<28} {:<28} {}", task.name(), depends_on, describe(task));
    }

    println!();
    println!("{} task(s)", graph.len());
    Ok(())
}

/// Description, or a summary of what the task does
fn describe(task: &Task) -> String {
    if let Some(description) = task.description() {
        return description.to_string();
    }
    match task.action() {
        TaskAction::None => "-".to_string(),
        TaskAction::EnsureStaged(dep) => format!("stage {}", dep.name()),
        TaskAction::Command(spec) => spec.display(),
    }
}
