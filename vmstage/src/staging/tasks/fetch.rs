//! Task: Fetch the Image Set.
//!
//! Every name missing from the work directory is downloaded from the
//! configured base URL. Names already present are left untouched and
//! reported to the operator on stdout.

use super::{log_task_error, task_start};
use crate::config::StageConfig;
use crate::host::HostOps;
use crate::pipeline::PipelineTask;
use crate::staging::types::{FetchOutcome, FetchReport, RunCtx};
use async_trait::async_trait;
use std::io::Write;
use tracing::info;
use vmstage_shared::errors::VmStageResult;

pub struct FetchTask;

#[async_trait]
impl PipelineTask<RunCtx> for FetchTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> VmStageResult<()> {
        let task_name = self.name();
        let (config, host) = task_start(&ctx, task_name).await;

        let mut stdout = std::io::stdout();
        let report = fetch_images(host.as_ref(), &config, &mut stdout)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        ctx.lock().await.fetch_report = Some(report);
        Ok(())
    }

    fn name(&self) -> &str {
        "fetch_images"
    }
}

/// Ensure every Image Set name exists in the work directory.
///
/// Stops at the first failed retrieval. Each name already on disk gets an
/// `already had <name>` line on `out`.
pub(crate) async fn fetch_images(
    host: &dyn HostOps,
    config: &StageConfig,
    out: &mut (dyn Write + Send),
) -> VmStageResult<FetchReport> {
    let mut report = FetchReport::default();

    for name in &config.images.names {
        let dest = config.resolve(name);

        let outcome = if tokio::fs::try_exists(&dest).await? {
            writeln!(out, "already had {}", name)?;
            info!(name = %name, "Image already present");
            FetchOutcome::AlreadyPresent
        } else {
            let url = config.images.url_for(name);
            info!(name = %name, url = %url, "Fetching image");
            host.fetch(&url, &dest).await?;
            FetchOutcome::Downloaded
        };

        report.entries.push((name.clone(), outcome));
    }

    Ok(report)
}
