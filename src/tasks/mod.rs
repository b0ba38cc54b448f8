//! Task dependency graph
//!
//! Tasks are named nodes with `depends_on` edges and an optional action.
//! Running a target executes its transitive prerequisites in topological
//! order, each at most once, and stops at the first failure.

mod native;

pub use native::{build_graph, name_matcher, STAGE_ALL_TASK};

use crate::dependency::Dependency;
use crate::error::{StageError, StageResult};
use crate::fetch::Fetcher;
use crate::stage::{StageOutcome, Stager};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// External program run by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Program and arguments joined for display
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a task does when it runs
#[derive(Debug, Clone)]
pub enum TaskAction {
    /// Aggregate task; only its prerequisites do work
    None,
    EnsureStaged(Dependency),
    Command(CommandSpec),
}

#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    description: Option<String>,
    depends_on: Vec<String>,
    action: TaskAction,
}

impl Task {
    pub fn new(name: impl Into<String>, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            description: None,
            depends_on: Vec::new(),
            action,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_dependency(name);
        }
        self
    }

    fn add_dependency(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.depends_on.contains(&name) {
            return false;
        }
        self.depends_on.push(name);
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    pub fn action(&self) -> &TaskAction {
        &self.action
    }
}

/// Result of one executed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Aggregate,
    Staged(StageOutcome),
    Command,
}

/// Named tasks and their prerequisite edges
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; names must be unique
    pub fn add(&mut self, task: Task) -> StageResult<()> {
        if self.tasks.contains_key(task.name()) {
            return Err(StageError::TaskDuplicate(task.name.clone()));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// All tasks, sorted by name
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Make `prerequisite` a dependency of every task whose name matches.
    ///
    /// Returns the names of the tasks that gained the edge.
    pub fn wire_prerequisite<M>(&mut self, matches: M, prerequisite: &str) -> StageResult<Vec<String>>
    where
        M: Fn(&str) -> bool,
    {
        if !self.tasks.contains_key(prerequisite) {
            return Err(StageError::TaskNotFound(prerequisite.to_string()));
        }

        let mut wired = Vec::new();
        for task in self.tasks.values_mut() {
            if task.name == prerequisite || !matches(&task.name) {
                continue;
            }
            if task.add_dependency(prerequisite) {
                debug!("{} now depends on {}", task.name, prerequisite);
                wired.push(task.name.clone());
            }
        }
        Ok(wired)
    }

    /// Every task `target` needs, prerequisites first, ending with `target`
    pub fn execution_order(&self, target: &str) -> StageResult<Vec<String>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        self.visit(target, &mut path, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> StageResult<()> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|n| n == name) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(StageError::TaskCycle(cycle));
        }

        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| StageError::TaskNotFound(name.to_string()))?;

        path.push(name.to_string());
        for dep in &task.depends_on {
            self.visit(dep, path, done, order)?;
        }
        path.pop();

        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// Check every edge resolves and the graph has no cycles
    pub fn validate(&self) -> StageResult<()> {
        let mut done = HashSet::new();
        let mut order = Vec::new();
        for name in self.tasks.keys() {
            self.visit(name, &mut Vec::new(), &mut done, &mut order)?;
        }
        Ok(())
    }

    /// `DEPSTAGE_<NAME>_DIR` for every dependency a task stages
    pub fn staged_env(&self) -> BTreeMap<String, String> {
        self.tasks
            .values()
            .filter_map(|task| match &task.action {
                TaskAction::EnsureStaged(dep) => Some((
                    dep.env_var(),
                    dep.canonical_dir().to_string_lossy().into_owned(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Run `target` and everything it depends on.
    ///
    /// `on_task` is called after each task completes.
    pub fn run<F, C>(
        &self,
        target: &str,
        stager: &Stager<F>,
        mut on_task: C,
    ) -> StageResult<Vec<(String, TaskOutcome)>>
    where
        F: Fetcher,
        C: FnMut(&str, &TaskOutcome),
    {
        let order = self.execution_order(target)?;
        let env = self.staged_env();
        info!("Running {} ({} tasks)", target, order.len());

        let mut results = Vec::with_capacity(order.len());
        for name in order {
            let task = self
                .tasks
                .get(&name)
                .ok_or_else(|| StageError::TaskNotFound(name.clone()))?;

            debug!("Executing task {}", name);
            let outcome = execute(task, stager, &env).map_err(|e| StageError::TaskFailed {
                task: name.clone(),
                source: Box::new(e),
            })?;

            on_task(&name, &outcome);
            results.push((name, outcome));
        }
        Ok(results)
    }
}

fn execute<F: Fetcher>(
    task: &Task,
    stager: &Stager<F>,
    staged_env: &BTreeMap<String, String>,
) -> StageResult<TaskOutcome> {
    match &task.action {
        TaskAction::None => Ok(TaskOutcome::Aggregate),
        TaskAction::EnsureStaged(dep) => stager.ensure_staged(dep).map(TaskOutcome::Staged),
        TaskAction::Command(spec) => {
            let command_line = spec.display();
            info!("$ {}", command_line);

            let status = Command::new(&spec.program)
                .args(&spec.args)
                .current_dir(&spec.cwd)
                .envs(staged_env)
                .envs(&spec.env)
                .status()
                .map_err(|e| StageError::command_failed(&command_line, e))?;

            if !status.success() {
                return Err(StageError::CommandExit {
                    command: command_line,
                    code: status.code().unwrap_or(-1),
                });
            }
            Ok(TaskOutcome::Command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoNetwork;

    impl Fetcher for NoNetwork {
        fn fetch(&self, url: &str, _destination: &Path) -> StageResult<u64> {
            Err(StageError::network(
                url,
                crate::error::NetworkErrorKind::Unreachable("offline".into()),
            ))
        }
    }

    fn aggregate(name: &str, deps: &[&str]) -> Task {
        Task::new(name, TaskAction::None).depends_on(deps.iter().copied())
    }

    fn diamond() -> TaskGraph {
        let mut graph = TaskGraph::new();
        graph.add(aggregate("fetch", &[])).unwrap();
        graph.add(aggregate("headers", &["fetch"])).unwrap();
        graph.add(aggregate("sources", &["fetch"])).unwrap();
        graph.add(aggregate("build", &["headers", "sources"])).unwrap();
        graph
    }

    #[test]
    fn order_puts_prerequisites_first_once() {
        let order = diamond().execution_order("build").unwrap();
        assert_eq!(order, vec!["fetch", "headers", "sources", "build"]);
    }

    #[test]
    fn order_excludes_unrelated_tasks() {
        let mut graph = diamond();
        graph.add(aggregate("docs", &[])).unwrap();
        assert_eq!(graph.execution_order("headers").unwrap(), vec!["fetch", "headers"]);
    }

    #[test]
    fn detects_cycles() {
        let mut graph = TaskGraph::new();
        graph.add(aggregate("a", &["b"])).unwrap();
        graph.add(aggregate("b", &["c"])).unwrap();
        graph.add(aggregate("c", &["a"])).unwrap();

        match graph.execution_order("a").unwrap_err() {
            StageError::TaskCycle(cycle) => assert_eq!(cycle, vec!["a", "b", "c", "a"]),
            other => panic!("expected cycle, got {other}"),
        }
        assert!(graph.validate().is_err());
    }

    #[test]
    fn unknown_task_and_edge() {
        let mut graph = TaskGraph::new();
        graph.add(aggregate("build", &["missing"])).unwrap();

        assert!(matches!(
            graph.execution_order("nope"),
            Err(StageError::TaskNotFound(name)) if name == "nope"
        ));
        assert!(matches!(
            graph.validate(),
            Err(StageError::TaskNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut graph = TaskGraph::new();
        graph.add(aggregate("build", &[])).unwrap();
        assert!(matches!(
            graph.add(aggregate("build", &[])),
            Err(StageError::TaskDuplicate(_))
        ));
    }

    #[test]
    fn wires_prerequisite_into_matching_tasks() {
        let mut graph = TaskGraph::new();
        graph.add(aggregate("stage", &[])).unwrap();
        graph.add(aggregate("externalNativeBuildDebug", &[])).unwrap();
        graph.add(aggregate("configureCMakeRelease", &[])).unwrap();
        graph.add(aggregate("assembleDebug", &[])).unwrap();

        let wired = graph
            .wire_prerequisite(name_matcher(&["CMake".into(), "externalNative".into()]), "stage")
            .unwrap();

        assert_eq!(wired, vec!["configureCMakeRelease", "externalNativeBuildDebug"]);
        assert_eq!(
            graph.get("externalNativeBuildDebug").unwrap().dependencies(),
            ["stage"]
        );
        assert!(graph.get("assembleDebug").unwrap().dependencies().is_empty());

        // Wiring twice does not duplicate the edge
        let again = graph.wire_prerequisite(|n| n.contains("CMake"), "stage").unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn wiring_requires_known_prerequisite() {
        let mut graph = diamond();
        assert!(matches!(
            graph.wire_prerequisite(|_| true, "stage"),
            Err(StageError::TaskNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn first_failure_halts_run() {
        let dir = TempDir::new().unwrap();
        let command = |program: &str, args: &[&str]| {
            TaskAction::Command(CommandSpec {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                cwd: dir.path().to_path_buf(),
                env: BTreeMap::new(),
            })
        };

        let mut graph = TaskGraph::new();
        graph.add(Task::new("fail", command("false", &[]))).unwrap();
        graph
            .add(Task::new("after", command("touch", &["ran"])).depends_on(["fail"]))
            .unwrap();

        let stager = Stager::new(NoNetwork, dir.path().join("scratch"));
        let mut seen = Vec::new();
        let err = graph
            .run("after", &stager, |name, _| seen.push(name.to_string()))
            .unwrap_err();

        match err {
            StageError::TaskFailed { task, source } => {
                assert_eq!(task, "fail");
                assert!(matches!(
                    *source,
                    StageError::CommandExit { ref command, code: 1 } if command == "false"
                ));
            }
            other => panic!("expected task failure, got {other}"),
        }
        assert!(seen.is_empty());
        assert!(!dir.path().join("ran").exists());
    }

    #[cfg(unix)]
    #[test]
    fn commands_receive_staged_dir_env() {
        let dir = TempDir::new().unwrap();
        let cpp = dir.path().join("cpp");
        let dep = Dependency::new("sdl2", "2.28.5", "https://example/sdl.zip", &cpp, "SDL2")
            .unwrap()
            .with_marker("include/SDL.h")
            .unwrap();
        std::fs::create_dir_all(cpp.join("SDL2/include")).unwrap();
        std::fs::write(cpp.join("SDL2/include/SDL.h"), "").unwrap();

        let mut graph = TaskGraph::new();
        graph
            .add(Task::new("stage-sdl2", TaskAction::EnsureStaged(dep)))
            .unwrap();
        graph
            .add(
                Task::new(
                    "print",
                    TaskAction::Command(CommandSpec {
                        program: "sh".into(),
                        args: vec!["-c".into(), "echo \"$DEPSTAGE_SDL2_DIR\" > env.txt".into()],
                        cwd: dir.path().to_path_buf(),
                        env: BTreeMap::new(),
                    }),
                )
                .depends_on(["stage-sdl2"]),
            )
            .unwrap();

        // Marker already present, so the offline fetcher is never used
        let stager = Stager::new(NoNetwork, dir.path().join("scratch"));
        let results = graph.run("print", &stager, |_, _| {}).unwrap();

        assert_eq!(
            results,
            vec![
                (
                    "stage-sdl2".to_string(),
                    TaskOutcome::Staged(StageOutcome::AlreadyStaged)
                ),
                ("print".to_string(), TaskOutcome::Command),
            ]
        );
        let printed = std::fs::read_to_string(dir.path().join("env.txt")).unwrap();
        assert_eq!(printed.trim(), cpp.join("SDL2").to_string_lossy());
    }
}
