//! Task: Launch the emulator.
//!
//! Builds the emulator argument vector and starts it detached. The handle
//! is stored in the context; nothing waits on the VM.

use super::{log_task_error, task_start};
use crate::config::StageConfig;
use crate::host::{HostOps, LaunchSpec};
use crate::pipeline::PipelineTask;
use crate::staging::types::RunCtx;
use crate::vmm::{QemuCommand, VmHandle};
use async_trait::async_trait;
use vmstage_shared::errors::{VmStageError, VmStageResult};

pub struct LaunchTask;

#[async_trait]
impl PipelineTask<RunCtx> for LaunchTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> VmStageResult<()> {
        let task_name = self.name();
        let (config, host) = task_start(&ctx, task_name).await;

        let vm = launch_vm(host.as_ref(), &config).inspect_err(|e| log_task_error(task_name, e))?;

        ctx.lock().await.vm = Some(vm);
        Ok(())
    }

    fn name(&self) -> &str {
        "launch_vm"
    }
}

pub(crate) fn launch_vm(host: &dyn HostOps, config: &StageConfig) -> VmStageResult<Box<dyn VmHandle>> {
    ensure_boot_files(config)?;

    let command = QemuCommand::from_config(&config.launch);
    tracing::info!(command = %command, "Launching emulator");

    let vm = host.launch(&LaunchSpec {
        program: command.program,
        args: command.args,
        cwd: config.work_dir.clone(),
    })?;
    tracing::info!(pid = vm.pid(), "Emulator started");

    for line in &config.launch.instructions {
        println!("{}", line);
    }

    Ok(vm)
}

/// The emulator only reports a missing kernel or drive after it starts.
fn ensure_boot_files(config: &StageConfig) -> VmStageResult<()> {
    let launch = &config.launch;
    let files = std::iter::once(&launch.kernel).chain(launch.drives.iter().map(|d| &d.file));
    for file in files {
        let path = config.resolve(file);
        if !path.is_file() {
            return Err(VmStageError::Launch(format!(
                "boot file missing: {}",
                path.display()
            )));
        }
    }
    Ok(())
}
