//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{ConfigManager, Project};
use crate::error::StageResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, project: &Project) -> StageResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(project)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
    }
    Ok(())
}

fn show_config(project: &Project) -> StageResult<()> {
    println!("# {}", project.root().display());
    println!("{}", toml::to_string_pretty(project.config())?);
    Ok(())
}
