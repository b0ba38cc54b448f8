//! Dependency descriptors
//!
//! A [`Dependency`] is the validated, immutable description of one native
//! library to stage: where to download it from and where it must end up.
//! It is built once from configuration and never mutated afterwards.

use crate::config::schema::DependencyConfig;
use crate::error::{StageError, StageResult};
use std::path::{Component, Path, PathBuf};

/// Marker used when a dependency does not declare one
pub const DEFAULT_MARKER: &str = "CMakeLists.txt";

/// A dependency to stage for a native build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    name: String,
    version: String,
    source_url: String,
    target_root: PathBuf,
    canonical_dir_name: String,
    marker: PathBuf,
    sha256: Option<String>,
}

impl Dependency {
    /// Create a descriptor with the default marker and no checksum.
    ///
    /// `source_url` may contain `{name}` and `{version}` placeholders.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        source_url: impl Into<String>,
        target_root: impl Into<PathBuf>,
        canonical_dir_name: impl Into<String>,
    ) -> StageResult<Self> {
        Self::build(
            name.into(),
            version.into(),
            source_url.into(),
            target_root.into(),
            canonical_dir_name.into(),
            PathBuf::from(DEFAULT_MARKER),
            None,
        )
    }

    /// Same descriptor with a different marker file
    pub fn with_marker(self, marker: impl Into<PathBuf>) -> StageResult<Self> {
        let Self {
            name,
            version,
            source_url,
            target_root,
            canonical_dir_name,
            sha256,
            ..
        } = self;
        Self::build(
            name,
            version,
            source_url,
            target_root,
            canonical_dir_name,
            marker.into(),
            sha256,
        )
    }

    /// Same descriptor with an expected archive checksum
    pub fn with_sha256(self, sha256: impl Into<String>) -> StageResult<Self> {
        let Self {
            name,
            version,
            source_url,
            target_root,
            canonical_dir_name,
            marker,
            ..
        } = self;
        Self::build(
            name,
            version,
            source_url,
            target_root,
            canonical_dir_name,
            marker,
            Some(sha256.into()),
        )
    }

    /// Build a descriptor from a `[[dependency]]` table.
    ///
    /// Relative `target_root` values are resolved against `project_root`.
    pub fn from_config(config: &DependencyConfig, project_root: &Path) -> StageResult<Self> {
        let target_root = if config.target_root.is_absolute() {
            config.target_root.clone()
        } else {
            project_root.join(&config.target_root)
        };

        Self::build(
            config.name.clone(),
            config.version.clone(),
            config.source_url.clone(),
            target_root,
            config.canonical_dir_name.clone(),
            config.marker.clone(),
            config.sha256.clone(),
        )
    }

    fn build(
        name: String,
        version: String,
        source_url: String,
        target_root: PathBuf,
        canonical_dir_name: String,
        marker: PathBuf,
        sha256: Option<String>,
    ) -> StageResult<Self> {
        let invalid = |reason: String| StageError::DependencyInvalid {
            name: name.clone(),
            reason,
        };

        validate_component(&name).map_err(|r| invalid(format!("name {}", r)))?;
        validate_component(&canonical_dir_name)
            .map_err(|r| invalid(format!("canonical_dir_name {}", r)))?;

        let version = version.trim().to_string();
        if version.is_empty() {
            return Err(invalid("version must not be empty".to_string()));
        }
        if version.contains(['/', '\\']) || version.contains("..") {
            return Err(invalid(format!(
                "version '{}' must not contain path separators",
                version
            )));
        }

        let source_url = source_url
            .replace("{version}", &version)
            .replace("{name}", &name);
        if !(source_url.starts_with("https://") || source_url.starts_with("http://")) {
            return Err(invalid(format!(
                "source_url must be an http(s) URL, got '{}'",
                source_url
            )));
        }

        if marker.as_os_str().is_empty()
            || !marker.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid(format!(
                "marker must be a relative path inside the staged directory, got '{}'",
                marker.display()
            )));
        }

        let sha256 = match sha256 {
            Some(hash) => {
                let hash = hash.trim().to_ascii_lowercase();
                if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(invalid("sha256 must be 64 hex characters".to_string()));
                }
                Some(hash)
            }
            None => None,
        };

        Ok(Self {
            name,
            version,
            source_url,
            target_root,
            canonical_dir_name,
            marker,
            sha256,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Source URL with placeholders expanded
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn canonical_dir_name(&self) -> &str {
        &self.canonical_dir_name
    }

    /// Marker path relative to the canonical directory
    pub fn marker(&self) -> &Path {
        &self.marker
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    /// `target_root/canonical_dir_name`
    pub fn canonical_dir(&self) -> PathBuf {
        self.target_root.join(&self.canonical_dir_name)
    }

    /// Absolute path of the staging marker
    pub fn marker_path(&self) -> PathBuf {
        self.canonical_dir().join(&self.marker)
    }

    /// Whether the staging marker is present
    pub fn is_staged(&self) -> bool {
        self.marker_path().is_file()
    }

    /// File name used for the downloaded archive in the scratch directory
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.zip", self.name, self.version)
    }

    /// Environment variable exporting the staged directory to native builds
    pub fn env_var(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("DEPSTAGE_{}_DIR", name)
    }
}

/// Validate that a value is a single safe path component.
fn validate_component(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value == "." || value == ".." || value.contains("..") {
        return Err(format!("'{}' must not contain '..'", value));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(format!(
            "'{}' must contain only alphanumeric characters, '-', '_' or '.'",
            value
        ));
    }
    Ok(())
}
