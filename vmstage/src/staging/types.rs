//! Type definitions for the staging pipeline.

use crate::config::StageConfig;
use crate::host::HostOps;
use crate::pipeline::PipelineMetrics;
use crate::vmm::VmHandle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What the fetcher did for one Image Set entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded,
}

/// Per-name fetch outcomes, in Image Set order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub entries: Vec<(String, FetchOutcome)>,
}

impl FetchReport {
    pub fn count(&self, outcome: FetchOutcome) -> usize {
        self.entries.iter().filter(|(_, o)| *o == outcome).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub image: PathBuf,
    /// Absolute guest paths of the staged artifacts, in copy order.
    pub staged: Vec<PathBuf>,
}

/// Shared pipeline context.
///
/// Inputs are immutable; each task stores its output for the next one.
pub struct RunContext {
    pub config: Arc<StageConfig>,
    pub host: Arc<dyn HostOps>,
    pub fetch_report: Option<FetchReport>,
    pub update_report: Option<UpdateReport>,
    pub vm: Option<Box<dyn VmHandle>>,
}

impl RunContext {
    pub fn new(config: Arc<StageConfig>, host: Arc<dyn HostOps>) -> Self {
        Self {
            config,
            host,
            fetch_report: None,
            update_report: None,
            vm: None,
        }
    }
}

pub type RunCtx = Arc<Mutex<RunContext>>;

/// Result of a completed staging run.
pub struct RunOutcome {
    pub fetch: FetchReport,
    pub update: UpdateReport,
    /// Detached emulator; dropping it leaves the VM running.
    pub vm: Box<dyn VmHandle>,
    pub metrics: PipelineMetrics,
}
