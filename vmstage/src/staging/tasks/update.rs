//! Task: Update the root image.
//!
//! Loop-mounts the image on a scoped temporary directory, copies the build
//! artifacts into the guest, unmounts, and removes the directory.

use super::{log_task_error, task_start};
use crate::config::StageConfig;
use crate::constants::staging::MOUNT_DIR_PREFIX;
use crate::fs::{LoopMount, LoopMountConfig};
use crate::host::HostOps;
use crate::pipeline::PipelineTask;
use crate::staging::types::{RunCtx, UpdateReport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};
use vmstage_shared::errors::{CopyCause, VmStageError, VmStageResult};

pub struct UpdateTask;

#[async_trait]
impl PipelineTask<RunCtx> for UpdateTask {
    async fn run(self: Box<Self>, ctx: RunCtx) -> VmStageResult<()> {
        let task_name = self.name();
        let (config, host) = task_start(&ctx, task_name).await;

        let report = update_image(host.as_ref(), &config)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        ctx.lock().await.update_report = Some(report);
        Ok(())
    }

    fn name(&self) -> &str {
        "update_image"
    }
}

/// One mount, one copy pass, one unmount.
///
/// The scoped directory never outlives the call unless the image is still
/// mounted on it, in which case it is left in place and a leak is reported.
/// Anything short of a confirmed unmount fails the step so the image is
/// never booted while a loop device may still hold it.
pub(crate) async fn update_image(
    host: &dyn HostOps,
    config: &StageConfig,
) -> VmStageResult<UpdateReport> {
    let scratch = tempfile::Builder::new()
        .prefix(MOUNT_DIR_PREFIX)
        .tempdir()?;
    let image = config.resolve(&config.update.image);

    // `mount` is declared after `scratch` so it drops first on unwind.
    let mount = LoopMount::acquire(
        host,
        &LoopMountConfig::new(&image, scratch.path(), &config.update.fs_type),
    )
    .await?;

    let copied = copy_artifacts(host, config, mount.target()).await;
    let released = mount.release().await;
    let released = remove_mount_point(host, &image, scratch, released);

    let staged = copied?;
    released?;

    info!(
        image = %image.display(),
        count = staged.len(),
        "Staged artifacts into guest image"
    );

    Ok(UpdateReport { image, staged })
}

/// Copy every artifact under `root`. Returns the guest paths written.
async fn copy_artifacts(
    host: &dyn HostOps,
    config: &StageConfig,
    root: &Path,
) -> VmStageResult<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(config.update.artifacts.len());

    for artifact in &config.update.artifacts {
        let source = config.resolve(&artifact.source);
        let file_name = source.file_name().ok_or_else(|| {
            VmStageError::Config(format!(
                "Artifact has no file name: {}",
                artifact.source.display()
            ))
        })?;
        let guest_dir = artifact.dest_dir(&config.update.guest_dir);

        let host_dir = root.join(guest_dir);
        tokio::fs::create_dir_all(&host_dir)
            .await
            .map_err(|e| VmStageError::Copy {
                source_path: source.clone(),
                cause: CopyCause::Io(format!(
                    "cannot create guest directory {}: {}",
                    guest_dir.display(),
                    e
                )),
            })?;

        let bytes = host.copy(&source, &host_dir.join(file_name)).await?;

        let guest_path = Path::new("/").join(guest_dir).join(file_name);
        info!(
            source = %source.display(),
            guest_path = %guest_path.display(),
            bytes,
            "Copied artifact"
        );
        staged.push(guest_path);
    }

    Ok(staged)
}

/// Remove the mount point once the mount is gone.
///
/// After a failed unmount the mount is lazily detached and the step fails
/// with `ImageInUse`. If the detach fails too the directory is only removed
/// non-recursively, which fails while the image is still mounted, so the
/// image contents are never deleted.
fn remove_mount_point(
    host: &dyn HostOps,
    image: &Path,
    scratch: TempDir,
    released: VmStageResult<()>,
) -> VmStageResult<()> {
    let result = match released {
        Ok(()) => Ok(()),
        Err(unmount_err) => {
            warn!(
                target = %scratch.path().display(),
                error = %unmount_err,
                "Unmount failed, loop mount leaked; attempting lazy detach"
            );
            if let Err(detach_err) = host.detach(scratch.path()) {
                #[allow(deprecated)]
                let path = scratch.into_path();
                if let Err(e) = std::fs::remove_dir(&path) {
                    warn!(
                        target = %path.display(),
                        error = %e,
                        detach_error = %detach_err,
                        "Image is still mounted; unmount it and remove the directory manually"
                    );
                }
                return Err(unmount_err);
            }
            warn!(
                target = %scratch.path().display(),
                image = %image.display(),
                "Loop mount lazily detached; image may still be in use, not booting it"
            );
            Err(VmStageError::ImageInUse {
                image: image.to_path_buf(),
            })
        }
    };

    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(target = %path.display(), error = %e, "Failed to remove mount point");
    }
    result
}
