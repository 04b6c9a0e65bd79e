//! Pipeline tasks, one per staging step.

mod fetch;
mod launch;
mod update;

pub use fetch::FetchTask;
pub use launch::LaunchTask;
pub use update::UpdateTask;

use super::types::RunCtx;
use crate::config::StageConfig;
use crate::host::HostOps;
use std::sync::Arc;
use vmstage_shared::errors::VmStageError;

/// Log task start and return the shared inputs.
async fn task_start(ctx: &RunCtx, task_name: &str) -> (Arc<StageConfig>, Arc<dyn HostOps>) {
    tracing::debug!(task = task_name, "Task started");
    let ctx = ctx.lock().await;
    (Arc::clone(&ctx.config), Arc::clone(&ctx.host))
}

fn log_task_error(task_name: &str, error: &VmStageError) {
    tracing::error!(task = task_name, error = %error, "Task failed");
}
