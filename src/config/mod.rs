//! Configuration management for depstage

pub mod schema;

pub use schema::Config;

use crate::dependency::Dependency;
use crate::error::{StageError, StageResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "depstage.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Walk up from `start` looking for `depstage.toml`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration; the file must exist
    pub async fn load(&self) -> StageResult<Config> {
        if !self.config_path.exists() {
            return Err(StageError::ConfigNotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            StageError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        let config = toml::from_str(&content).map_err(|e| StageError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;
        debug!("Loaded config from {}", self.config_path.display());
        Ok(config)
    }

    /// Load the configuration together with the project root it applies to
    pub async fn load_project(&self) -> StageResult<Project> {
        let config = self.load().await?;
        Ok(Project::new(self.project_root(), config))
    }

    /// Directory relative paths in the config are resolved against
    pub fn project_root(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

/// A loaded configuration anchored at its project root
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a possibly relative path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute scratch directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.scratch_dir)
    }

    /// Validate every declared dependency.
    ///
    /// Names must be unique, and no two dependencies may stage into the
    /// same canonical directory.
    pub fn dependencies(&self) -> StageResult<Vec<Dependency>> {
        let dependencies = self
            .config
            .dependencies
            .iter()
            .map(|d| Dependency::from_config(d, &self.root))
            .collect::<StageResult<Vec<_>>>()?;

        let mut names = HashSet::new();
        let mut dirs = HashSet::new();
        for dep in &dependencies {
            if !names.insert(dep.name()) {
                return Err(self.invalid(format!(
                    "dependency '{}' is declared twice",
                    dep.name()
                )));
            }
            let dir = dep.canonical_dir();
            if !dirs.insert(dir.clone()) {
                return Err(self.invalid(format!(
                    "dependency '{}' stages into {}, which is already used",
                    dep.name(),
                    dir.display()
                )));
            }
        }
        Ok(dependencies)
    }

    /// Validate the named dependencies, or all of them when `names` is empty
    pub fn select_dependencies(&self, names: &[String]) -> StageResult<Vec<Dependency>> {
        let all = self.dependencies()?;
        if names.is_empty() {
            return Ok(all);
        }

        names
            .iter()
            .map(|name| {
                all.iter()
                    .find(|dep| dep.name() == name)
                    .cloned()
                    .ok_or_else(|| StageError::DependencyNotFound(name.clone()))
            })
            .collect()
    }

    fn invalid(&self, reason: String) -> StageError {
        StageError::ConfigInvalid {
            path: self.root.join(CONFIG_FILE_NAME),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[paths]
scratch_dir = "build/stage"

[[dependency]]
name = "sdl2"
version = "2.28.5"
source_url = "https://example/SDL2-{version}.zip"
target_root = "cpp"
canonical_dir_name = "SDL2"
"#;

    #[tokio::test]
    async fn load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("depstage.toml"));

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, StageError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn load_invalid_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("depstage.toml");
        std::fs::write(&path, "[[dependency]]\nname = 1\n").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, StageError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn project_resolves_relative_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("depstage.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let project = ConfigManager::with_path(path).load_project().await.unwrap();
        assert_eq!(project.scratch_dir(), temp.path().join("build/stage"));

        let deps = project.dependencies().unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].canonical_dir(), temp.path().join("cpp/SDL2"));
    }

    #[test]
    fn select_unknown_dependency_fails() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let project = Project::new("/work", config);

        assert_eq!(project.select_dependencies(&[]).unwrap().len(), 1);
        let err = project
            .select_dependencies(&["zlib".to_string()])
            .unwrap_err();
        assert!(matches!(err, StageError::DependencyNotFound(ref n) if n == "zlib"));
    }

    #[test]
    fn duplicate_dependency_names_rejected() {
        let config: Config = toml::from_str(&format!(
            r#"{SAMPLE}
[[dependency]]
name = "sdl2"
version = "2.30.0"
source_url = "https://example/SDL2-{{version}}.zip"
target_root = "vendor"
canonical_dir_name = "SDL2"
"#
        ))
        .unwrap();
        let project = Project::new("/work", config);

        match project.dependencies().unwrap_err() {
            StageError::ConfigInvalid { reason, .. } => assert!(reason.contains("'sdl2'")),
            other => panic!("expected invalid config, got {other}"),
        }
        assert!(project.select_dependencies(&["sdl2".to_string()]).is_err());
    }

    #[test]
    fn shared_canonical_dir_rejected() {
        let config: Config = toml::from_str(&format!(
            r#"{SAMPLE}
[[dependency]]
name = "sdl2-next"
version = "3.0.0"
source_url = "https://example/SDL3-{{version}}.zip"
target_root = "cpp"
canonical_dir_name = "SDL2"
"#
        ))
        .unwrap();
        let project = Project::new("/work", config);

        match project.dependencies().unwrap_err() {
            StageError::ConfigInvalid { reason, .. } => {
                assert!(reason.contains("'sdl2-next'"));
                assert!(reason.contains("already used"));
            }
            other => panic!("expected invalid config, got {other}"),
        }
    }

    #[test]
    fn finds_config_in_ancestor() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = temp.path().join("app/src/main");
        std::fs::create_dir_all(&nested).unwrap();

        let found = ConfigManager::find_local_config(&nested).unwrap();
        assert_eq!(found, temp.path().join(CONFIG_FILE_NAME));
    }
}
