//! Staging run orchestration.
//!
//! ## Architecture
//!
//! ```text
//! ensure_root          (gate, before anything touches the host)
//!   1. FetchImages     (download missing Image Set entries)
//!   2. UpdateImage     (loop mount → copy artifacts → unmount)
//!   3. LaunchVm        (spawn emulator detached, keep handle)
//! ```
//!
//! Each step is a sequential pipeline stage; a failing step stops the run
//! and its typed error is returned to the caller.

mod tasks;
mod types;

pub use types::{FetchOutcome, FetchReport, RunContext, RunCtx, RunOutcome, UpdateReport};

use crate::config::StageConfig;
use crate::host::HostOps;
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineBuilder, PipelineExecutor, Stage};
use crate::util::ensure_root;
use nix::unistd::Uid;
use std::sync::Arc;
use tokio::sync::Mutex;
use vmstage_shared::errors::{VmStageError, VmStageResult};

use tasks::{FetchTask, LaunchTask, UpdateTask};

fn get_execution_plan() -> ExecutionPlan<RunCtx> {
    let stages: Vec<Stage<BoxedTask<RunCtx>>> = vec![
        Stage::sequential(vec![Box::new(FetchTask)]),
        Stage::sequential(vec![Box::new(UpdateTask)]),
        Stage::sequential(vec![Box::new(LaunchTask)]),
    ];

    ExecutionPlan::new(stages)
}

/// Run the full staging sequence as `euid`.
///
/// Returns once the emulator has been started; the VM is not waited on.
pub async fn run(
    host: Arc<dyn HostOps>,
    config: StageConfig,
    euid: Uid,
) -> VmStageResult<RunOutcome> {
    ensure_root(euid)?;
    config.sanitize()?;
    if !config.work_dir.is_dir() {
        return Err(VmStageError::Config(format!(
            "Work directory does not exist: {}",
            config.work_dir.display()
        )));
    }

    let ctx = Arc::new(Mutex::new(RunContext::new(Arc::new(config), host)));

    let pipeline = PipelineBuilder::from_plan(get_execution_plan());
    let metrics = PipelineExecutor::execute(pipeline, Arc::clone(&ctx)).await?;
    metrics.log_stages();

    let mut ctx = ctx.lock().await;
    let fetch = ctx
        .fetch_report
        .take()
        .ok_or_else(|| VmStageError::Internal("fetch task must run first".into()))?;
    let update = ctx
        .update_report
        .take()
        .ok_or_else(|| VmStageError::Internal("update task must run first".into()))?;
    let vm = ctx
        .vm
        .take()
        .ok_or_else(|| VmStageError::Internal("launch task did not set a VM handle".into()))?;

    Ok(RunOutcome {
        fetch,
        update,
        vm,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::{FAKE_PID, FakeHost};
    use crate::vmm::QemuCommand;
    use vmstage_shared::errors::FetchCause;

    fn root() -> Uid {
        Uid::from_raw(0)
    }

    struct Workspace {
        _root: tempfile::TempDir,
        config: StageConfig,
    }

    /// Work dir plus the three build outputs; images optional.
    fn workspace(with_images: bool) -> Workspace {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("qemu");
        std::fs::create_dir_all(&work_dir).unwrap();
        std::fs::create_dir_all(root.path().join("kernel")).unwrap();
        std::fs::create_dir_all(root.path().join("user")).unwrap();
        std::fs::write(root.path().join("kernel/ram-disk-queue.ko"), b"q").unwrap();
        std::fs::write(root.path().join("kernel/ram-disk-bio.ko"), b"b").unwrap();
        std::fs::write(root.path().join("user/ram-disk-test"), b"t").unwrap();

        let config = StageConfig {
            work_dir,
            ..StageConfig::default()
        };
        if with_images {
            for name in &config.images.names {
                std::fs::write(config.resolve(name), b"img").unwrap();
            }
        }
        Workspace {
            _root: root,
            config,
        }
    }

    #[tokio::test]
    async fn test_all_images_present() {
        let ws = workspace(true);
        let host = Arc::new(FakeHost::new());

        let outcome = run(host.clone(), ws.config.clone(), root()).await.unwrap();

        assert_eq!(outcome.fetch.count(FetchOutcome::AlreadyPresent), 4);
        assert!(host.fetched_urls().is_empty());
        assert_eq!(
            host.call_kinds(),
            vec!["mount", "copy", "copy", "copy", "unmount", "launch"]
        );
        assert_eq!(outcome.update.staged.len(), 3);
        assert_eq!(outcome.vm.pid(), FAKE_PID);
        assert_eq!(
            host.launched().unwrap().args,
            QemuCommand::from_config(&ws.config.launch).args
        );
        let names: Vec<_> = outcome.metrics.tasks().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["fetch_images", "update_image", "launch_vm"]);
    }

    #[tokio::test]
    async fn test_no_images_present() {
        let ws = workspace(false);
        let host = Arc::new(FakeHost::new());

        let outcome = run(host.clone(), ws.config.clone(), root()).await.unwrap();

        assert_eq!(outcome.fetch.count(FetchOutcome::Downloaded), 4);
        let expected: Vec<String> = ws
            .config
            .images
            .names
            .iter()
            .map(|n| ws.config.images.url_for(n))
            .collect();
        assert_eq!(host.fetched_urls(), expected);
        assert_eq!(
            host.call_kinds(),
            vec![
                "fetch", "fetch", "fetch", "fetch", "mount", "copy", "copy", "copy", "unmount",
                "launch"
            ]
        );
    }

    #[tokio::test]
    async fn test_unprivileged_caller_touches_nothing() {
        let ws = workspace(false);
        let host = Arc::new(FakeHost::new());

        let result = run(host.clone(), ws.config.clone(), Uid::from_raw(1000)).await;

        let err = result.err().unwrap();
        assert!(matches!(err, VmStageError::NotRoot));
        assert_eq!(err.to_string(), "Must be root");
        assert!(host.calls().is_empty());
        for name in &ws.config.images.names {
            assert!(!ws.config.resolve(name).exists());
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_before_mount() {
        let ws = workspace(false);
        let mut host = FakeHost::new();
        host.fetch_failures
            .insert("bzImage16_Linux6.8.0-rc7".into(), FetchCause::Network);
        let host = Arc::new(host);

        let err = run(host.clone(), ws.config.clone(), root()).await.err().unwrap();

        assert!(matches!(
            err,
            VmStageError::Fetch {
                cause: FetchCause::Network,
                ..
            }
        ));
        assert!(!host.call_kinds().contains(&"mount"));
        assert!(host.launched().is_none());
    }

    #[tokio::test]
    async fn test_copy_failure_never_launches() {
        let ws = workspace(true);
        std::fs::remove_file(ws.config.resolve("../user/ram-disk-test")).unwrap();
        let host = Arc::new(FakeHost::new());

        let err = run(host.clone(), ws.config.clone(), root()).await.err().unwrap();

        assert!(matches!(err, VmStageError::Copy { .. }));
        assert_eq!(host.call_kinds().last(), Some(&"unmount"));
        assert!(host.launched().is_none());
    }

    #[tokio::test]
    async fn test_unmount_failure_never_launches() {
        let ws = workspace(true);
        let host = Arc::new(FakeHost {
            unmount_fails: true,
            ..FakeHost::new()
        });

        let err = run(host.clone(), ws.config.clone(), root()).await.err().unwrap();

        assert!(matches!(err, VmStageError::ImageInUse { .. }));
        assert_eq!(
            host.call_kinds(),
            vec!["mount", "copy", "copy", "copy", "unmount", "detach"]
        );
        assert!(host.launched().is_none());
    }

    #[tokio::test]
    async fn test_unmount_and_detach_failure_never_launches() {
        let ws = workspace(true);
        let host = Arc::new(FakeHost {
            unmount_fails: true,
            detach_fails: true,
            ..FakeHost::new()
        });

        let err = run(host.clone(), ws.config.clone(), root()).await.err().unwrap();

        assert!(matches!(err, VmStageError::Unmount { .. }));
        assert!(host.launched().is_none());
        // Copied files keep the fake mount point alive
        std::fs::remove_dir_all(host.mount_target().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_config_error() {
        let ws = workspace(true);
        let mut config = ws.config.clone();
        config.work_dir = config.work_dir.join("absent");
        let host = Arc::new(FakeHost::new());

        let err = run(host.clone(), config, root()).await.err().unwrap();

        assert!(matches!(err, VmStageError::Config(_)));
        assert!(host.calls().is_empty());
    }
}
