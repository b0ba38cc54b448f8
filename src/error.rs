//! Error types for depstage
//!
//! All modules use `StageResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for depstage operations
pub type StageResult<T> = Result<T, StageError>;

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// DNS, connect or protocol failure before a response arrived
    Unreachable(String),
    /// Server answered with a non-success status
    Status(u16),
    /// Stream ended before the declared length was received
    Truncated { expected: u64, received: u64 },
    /// Stream failed part way through
    Interrupted(String),
    /// Configured fetch deadline expired
    Timeout,
    /// Downloaded bytes do not match the declared sha256
    IntegrityMismatch { expected: String, actual: String },
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(reason) => write!(f, "unreachable ({})", reason),
            Self::Status(code) => write!(f, "server returned HTTP {}", code),
            Self::Truncated { expected, received } => write!(
                f,
                "stream truncated after {} of {} bytes",
                received, expected
            ),
            Self::Interrupted(reason) => write!(f, "stream interrupted ({})", reason),
            Self::Timeout => write!(f, "timed out"),
            Self::IntegrityMismatch { expected, actual } => write!(
                f,
                "sha256 mismatch (expected {}, got {})",
                expected, actual
            ),
        }
    }
}

/// Why an extraction failed
#[derive(Debug)]
pub enum ExtractionErrorKind {
    /// Archive or one of its entries could not be read
    Archive(String),
    /// Entry name escapes the target directory
    UnsafePath(String),
    /// Destination could not be written
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Archive was extracted but did not produce the staging marker
    MarkerMissing(PathBuf),
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive(reason) => write!(f, "unreadable archive: {}", reason),
            Self::UnsafePath(name) => write!(f, "entry escapes target directory: {}", name),
            Self::Write { path, source } => write!(f, "writing {}: {}", path.display(), source),
            Self::MarkerMissing(path) => {
                write!(f, "archive did not contain marker {}", path.display())
            }
        }
    }
}

/// Coarse failure class reported to the invoking build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Extraction,
    Filesystem,
    Configuration,
    Task,
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Extraction => "extraction",
            Self::Filesystem => "filesystem",
            Self::Configuration => "configuration",
            Self::Task => "task",
            Self::Other => "other",
        }
    }
}

/// All errors that can occur in depstage
#[derive(Error, Debug)]
pub enum StageError {
    // Staging errors
    #[error("Fetching {url} failed: {kind}")]
    Network { url: String, kind: NetworkErrorKind },

    #[error("Extracting {} failed: {kind}", .archive.display())]
    Extraction {
        archive: PathBuf,
        kind: ExtractionErrorKind,
    },

    #[error("Filesystem error {context} at {}: {source}", .path.display())]
    Filesystem {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {}: {reason}", .path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid dependency '{name}': {reason}")]
    DependencyInvalid { name: String, reason: String },

    #[error("Dependency not declared: {0}")]
    DependencyNotFound(String),

    // Task errors
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already registered: {0}")]
    TaskDuplicate(String),

    #[error("Task cycle detected: {}", .0.join(" -> "))]
    TaskCycle(Vec<String>),

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<StageError>,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited unsuccessfully: {command}, exit code: {code}")]
    CommandExit { command: String, code: i32 },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl StageError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, kind: NetworkErrorKind) -> Self {
        Self::Network {
            url: url.into(),
            kind,
        }
    }

    /// Create an extraction error for an archive
    pub fn extraction(archive: impl Into<PathBuf>, kind: ExtractionErrorKind) -> Self {
        Self::Extraction {
            archive: archive.into(),
            kind,
        }
    }

    /// Create a filesystem error with context
    pub fn filesystem(
        context: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            context: context.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Map the error onto the staging failure taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::Extraction { .. } => ErrorCategory::Extraction,
            Self::Filesystem { .. } | Self::Lock { .. } | Self::Io { .. } => {
                ErrorCategory::Filesystem
            }
            Self::ConfigInvalid { .. }
            | Self::ConfigNotFound(_)
            | Self::DependencyInvalid { .. }
            | Self::DependencyNotFound(_)
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorCategory::Configuration,
            Self::TaskFailed { source, .. } => source.category(),
            Self::TaskNotFound(_)
            | Self::TaskDuplicate(_)
            | Self::TaskCycle(_)
            | Self::CommandFailed { .. }
            | Self::CommandExit { .. } => ErrorCategory::Task,
            Self::Json(_) | Self::Internal(_) | Self::User(_) => ErrorCategory::Other,
        }
    }

    /// Check if re-running the build may succeed without changes
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { kind, .. } => matches!(
                kind,
                NetworkErrorKind::Unreachable(_)
                    | NetworkErrorKind::Truncated { .. }
                    | NetworkErrorKind::Interrupted(_)
                    | NetworkErrorKind::Timeout
            ) || matches!(kind, NetworkErrorKind::Status(code) if *code >= 500),
            Self::TaskFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: depstage init"),
            Self::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            } => Some("Raise fetch.timeout_secs in depstage.toml or check your connection"),
            Self::Network {
                kind: NetworkErrorKind::Status(404),
                ..
            } => Some("Check the dependency version and source_url"),
            Self::Network {
                kind: NetworkErrorKind::IntegrityMismatch { .. },
                ..
            } => Some("Verify the sha256 declared for this dependency"),
            Self::Extraction {
                kind: ExtractionErrorKind::MarkerMissing(_),
                ..
            } => Some("Check the marker path declared for this dependency"),
            Self::Lock { .. } => Some("Another build may be staging the same dependency"),
            Self::TaskNotFound(_) => Some("Run: depstage tasks"),
            Self::TaskFailed { source, .. } => source.hint(),
            _ if self.is_retryable() => Some("Network failures are not retried; run the build again"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StageError::network("https://example/a.zip", NetworkErrorKind::Status(404));
        assert_eq!(
            err.to_string(),
            "Fetching https://example/a.zip failed: server returned HTTP 404"
        );
    }

    #[test]
    fn error_hint() {
        let err = StageError::ConfigNotFound(PathBuf::from("depstage.toml"));
        assert_eq!(err.hint(), Some("Run: depstage init"));

        let err = StageError::network("u", NetworkErrorKind::Interrupted("reset".into()));
        assert_eq!(
            err.hint(),
            Some("Network failures are not retried; run the build again")
        );
    }

    #[test]
    fn error_retryable() {
        assert!(StageError::network("u", NetworkErrorKind::Timeout).is_retryable());
        assert!(StageError::network("u", NetworkErrorKind::Status(503)).is_retryable());
        assert!(!StageError::network("u", NetworkErrorKind::Status(404)).is_retryable());
        assert!(!StageError::DependencyNotFound("x".into()).is_retryable());
    }

    #[test]
    fn category_follows_task_source() {
        let inner = StageError::extraction(
            "a.zip",
            ExtractionErrorKind::Archive("bad header".into()),
        );
        let err = StageError::TaskFailed {
            task: "stage-sdl2".into(),
            source: Box::new(inner),
        };
        assert_eq!(err.category(), ErrorCategory::Extraction);
        assert_eq!(
            StageError::TaskCycle(vec!["a".into(), "b".into(), "a".into()]).to_string(),
            "Task cycle detected: a -> b -> a"
        );
    }
}
