//! Status command - show which dependencies are staged

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Project;
use crate::dependency::Dependency;
use crate::error::StageResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// Staging state of one dependency
#[derive(Debug, Serialize)]
struct DependencyStatus {
    name: String,
    version: String,
    staged: bool,
    path: PathBuf,
    marker: PathBuf,
    source_url: String,
}

impl From<&Dependency> for DependencyStatus {
    fn from(dep: &Dependency) -> Self {
        Self {
            name: dep.name().to_string(),
            version: dep.version().to_string(),
            staged: dep.is_staged(),
            path: dep.canonical_dir(),
            marker: dep.marker().to_path_buf(),
            source_url: dep.source_url().to_string(),
        }
    }
}

impl DependencyStatus {
    fn state(&self) -> &'static str {
        if self.staged {
            "staged"
        } else {
            "missing"
        }
    }
}

/// Execute the status command
pub async fn execute(args: StatusArgs, project: &Project) -> StageResult<()> {
    let statuses: Vec<DependencyStatus> = project
        .dependencies()?
        .iter()
        .map(DependencyStatus::from)
        .collect();

    if statuses.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No dependencies declared");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&statuses),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Plain => print_plain(&statuses),
    }

    Ok(())
}

fn print_table(statuses: &[DependencyStatus]) {
    println!(
        "{:<16} {:<12} {:<10} {}",
        style("NAME").bold(),
        style("VERSION").bold(),
        style("STATE").bold(),
        style("PATH").bold()
    );
    println!("{}", "-".repeat(72));

    for status in statuses {
        let state = if status.staged {
            style(status.state()).green()
        } else {
            style(status.state()).yellow()
        };
        println!(
            "{:<16} {:<12} {:<10} {}",
            status.name,
            status.version,
            state,
            status.path.display()
        );
    }

    let staged = statuses.iter().filter(|s| s.staged).count();
    println!();
    println!("{}/{} staged", staged, statuses.len());
}

fn print_plain(statuses: &[DependencyStatus]) {
    for status in statuses {
        println!("{} {}", status.name, status.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dependency(root: &std::path::Path) -> Dependency {
        Dependency::new("sdl2", "2.28.5", "https://example/sdl.zip", root, "SDL2")
            .unwrap()
            .with_marker("include/SDL.h")
            .unwrap()
    }

    #[test]
    fn reports_missing_until_marker_exists() {
        let temp = TempDir::new().unwrap();
        let dep = dependency(temp.path());

        let status = DependencyStatus::from(&dep);
        assert!(!status.staged);
        assert_eq!(status.state(), "missing");

        std::fs::create_dir_all(temp.path().join("SDL2/include")).unwrap();
        std::fs::write(temp.path().join("SDL2/include/SDL.h"), "").unwrap();

        let status = DependencyStatus::from(&dep);
        assert!(status.staged);
        assert_eq!(status.path, temp.path().join("SDL2"));
    }

    #[test]
    fn serializes_to_json() {
        let temp = TempDir::new().unwrap();
        let status = DependencyStatus::from(&dependency(temp.path()));

        let json: serde_json::Value = serde_json::to_value(&status).unwrap();
        assert_eq!(json["name"], "sdl2");
        assert_eq!(json["staged"], false);
        assert_eq!(json["marker"], "include/SDL.h");
    }
}
