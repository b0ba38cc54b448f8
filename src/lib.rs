//! depstage - idempotent dependency staging for native builds
//!
//! Fetches a third-party source archive once, extracts it under a
//! version-independent directory name and gates repeat work on a marker
//! file. Staging is wired into a task graph as a prerequisite of every
//! native-build task.

pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod integrity;
pub mod journal;
pub mod lock;
pub mod stage;
pub mod tasks;
pub mod ui;

pub use dependency::Dependency;
pub use error::{StageError, StageResult};
pub use stage::{StageOutcome, Stager};
