//! Build a task graph from project configuration
//!
//! Every dependency gets a `stage-<name>` task. The aggregate `stage` task
//! depends on all of them and is wired in front of each native-build task
//! matched by `native.prerequisite_patterns`.

use super::{CommandSpec, Task, TaskAction, TaskGraph};
use crate::config::{schema::TaskConfig, Project};
use crate::error::{StageError, StageResult};
use tracing::debug;

/// Aggregate task that stages every dependency
pub const STAGE_ALL_TASK: &str = "stage";

/// Matches task names containing any of `patterns`
pub fn name_matcher(patterns: &[String]) -> impl Fn(&str) -> bool + '_ {
    move |name| patterns.iter().any(|p| name.contains(p.as_str()))
}

/// Assemble the staging tasks, configured tasks and prerequisite wiring
pub fn build_graph(project: &Project) -> StageResult<TaskGraph> {
    let mut graph = TaskGraph::new();

    let dependencies = project.dependencies()?;
    let mut stage_tasks = Vec::with_capacity(dependencies.len());
    for dep in dependencies {
        let name = format!("stage-{}", dep.name());
        let description = format!(
            "Stage {} {} into {}",
            dep.name(),
            dep.version(),
            dep.canonical_dir().display()
        );
        graph.add(Task::new(&name, TaskAction::EnsureStaged(dep)).with_description(description))?;
        stage_tasks.push(name);
    }

    graph.add(
        Task::new(STAGE_ALL_TASK, TaskAction::None)
            .with_description("Stage all dependencies")
            .depends_on(stage_tasks.iter().cloned()),
    )?;

    for config in &project.config().tasks {
        graph.add(configured_task(project, config)?)?;
    }

    // Staging tasks never depend on the aggregate, whatever the patterns match
    let is_native = name_matcher(&project.config().native.prerequisite_patterns);
    let wired = graph.wire_prerequisite(
        |name| !stage_tasks.iter().any(|t| t == name) && is_native(name),
        STAGE_ALL_TASK,
    )?;
    debug!("Wired staging before: {:?}", wired);

    graph.validate()?;
    Ok(graph)
}

fn configured_task(project: &Project, config: &TaskConfig) -> StageResult<Task> {
    let name = config.name.trim();
    if name.is_empty() {
        return Err(StageError::ConfigInvalid {
            path: project.root().to_path_buf(),
            reason: "task name must not be empty".to_string(),
        });
    }

    let action = match config.command.split_first() {
        None => TaskAction::None,
        Some((program, args)) => TaskAction::Command(CommandSpec {
            program: program.clone(),
            args: args.to_vec(),
            cwd: config
                .cwd
                .as_deref()
                .map(|cwd| project.resolve(cwd))
                .unwrap_or_else(|| project.root().to_path_buf()),
            env: config.env.clone(),
        }),
    };

    let mut task = Task::new(name, action).depends_on(config.depends_on.iter().cloned());
    if let Some(description) = &config.description {
        task = task.with_description(description.clone());
    }
    Ok(task)
}
