//! Init command - create depstage.toml

use crate::cli::args::InitArgs;
use crate::config::CONFIG_FILE_NAME;
use crate::error::{StageError, StageResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for a new project
const INIT_TEMPLATE: &str = r#"# depstage configuration
# Relative paths are resolved against this file's directory.

[general]
journal = true

[paths]
scratch_dir = "build/depstage"

[fetch]
timeout_secs = 300   # 0 disables the deadline
progress = true

[native]
# Tasks whose name contains any of these run after staging
prerequisite_patterns = ["CMake", "externalNative"]

[[dependency]]
name = "sdl2"
version = "2.28.5"
source_url = "https://github.com/libsdl-org/SDL/releases/download/release-{version}/SDL2-{version}.zip"
target_root = "app/src/main/cpp"
canonical_dir_name = "SDL2"
marker = "include/SDL.h"
# sha256 = "<hex digest of the archive>"

# [[task]]
# name = "externalNativeBuildDebug"
# command = ["cmake", "--build", "build"]
# cwd = "app"
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> StageResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| StageError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        return Err(StageError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| StageError::filesystem("writing config", &config_path, e))?;

    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );

    Ok(())
}

async fn ensure_dir(dir: &Path) -> StageResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StageError::filesystem("creating directory", dir, e))?;
    }
    Ok(())
}
