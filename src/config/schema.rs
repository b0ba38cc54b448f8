//! Configuration schema for depstage
//!
//! Configuration lives in `depstage.toml` at the project root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Scratch and output locations
    pub paths: PathsConfig,

    /// Archive download settings
    pub fetch: FetchConfig,

    /// Native build wiring
    pub native: NativeConfig,

    /// Dependencies to stage
    #[serde(rename = "dependency")]
    pub dependencies: Vec<DependencyConfig>,

    /// Build tasks
    #[serde(rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Record staging runs in the scratch directory journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { journal: true }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for downloaded archives, locks and the journal
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("build/depstage"),
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-transfer deadline in seconds (0 = no deadline)
    pub timeout_secs: u64,

    /// Show a progress bar in interactive terminals
    pub progress: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            progress: true,
        }
    }
}

/// Native build wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Tasks whose name contains any of these get staging as a prerequisite
    pub prerequisite_patterns: Vec<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            prerequisite_patterns: vec!["CMake".to_string(), "externalNative".to_string()],
        }
    }
}

fn default_marker() -> PathBuf {
    PathBuf::from(crate::dependency::DEFAULT_MARKER)
}

/// A `[[dependency]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Dependency name (also used for task and archive names)
    pub name: String,

    /// Upstream version string
    pub version: String,

    /// Archive URL, may use `{name}` and `{version}` placeholders
    pub source_url: String,

    /// Directory the canonical directory is created in
    pub target_root: PathBuf,

    /// Version-independent directory name consumed by the native build
    pub canonical_dir_name: String,

    /// File inside the canonical directory whose presence means "staged"
    #[serde(default = "default_marker")]
    pub marker: PathBuf,

    /// Expected SHA-256 of the downloaded archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A `[[task]]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Task name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tasks that must run first
    pub depends_on: Vec<String>,

    /// Program and arguments (empty = aggregate task with no action)
    pub command: Vec<String>,

    /// Working directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for the command
    pub env: BTreeMap<String, String>,
}
