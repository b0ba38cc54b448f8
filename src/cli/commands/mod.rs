//! CLI command implementations

pub mod clean;
pub mod config;
pub mod init;
pub mod run;
pub mod stage;
pub mod status;
pub mod tasks;

pub use clean::execute as clean;
pub use config::execute as config;
pub use init::execute as init;
pub use run::execute as run;
pub use stage::execute as stage;
pub use status::execute as status;
pub use tasks::execute as tasks;

use crate::config::Project;
use crate::error::{StageError, StageResult};
use crate::fetch::HttpFetcher;
use crate::journal::Journal;
use crate::stage::Stager;
use crate::ui::UiContext;

/// Stager configured from the project's fetch and journal settings
pub(crate) fn build_stager(project: &Project, ctx: &UiContext) -> Stager<HttpFetcher> {
    let config = project.config();
    let scratch_dir = project.scratch_dir();

    let fetcher = HttpFetcher::from_config(&config.fetch)
        .with_progress(config.fetch.progress && ctx.use_fancy_output());

    Stager::new(fetcher, &scratch_dir)
        .with_journal(Journal::new(&scratch_dir, config.general.journal))
}

/// Run synchronous staging work off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> StageResult<T>
where
    F: FnOnce() -> StageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StageError::Internal(format!("Staging task failed: {}", e)))?
}
