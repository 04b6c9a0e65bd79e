//! Production host: shells out to wget, mount, umount and the emulator.

use super::{HostOps, LaunchSpec, copy_file};
use crate::config::ToolPaths;
use crate::vmm::{QemuHandler, VmHandle, spawn_detached};
use async_trait::async_trait;
use nix::mount::{MntFlags, umount2};
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::{debug, warn};
use vmstage_shared::errors::{FetchCause, MountCause, VmStageError, VmStageResult};

/// wget exit status for a network failure
const WGET_NETWORK_FAILURE: i32 = 4;
/// wget exit status for an SSL verification failure
const WGET_SSL_FAILURE: i32 = 5;
/// wget exit status for a server error response
const WGET_SERVER_ERROR: i32 = 8;

pub struct SystemHost {
    tools: ToolPaths,
}

impl SystemHost {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl HostOps for SystemHost {
    async fn fetch(&self, url: &str, dest: &Path) -> VmStageResult<()> {
        let fetch_err = |cause| VmStageError::Fetch {
            name: display_name(dest),
            url: url.to_string(),
            cause,
        };

        // Progress output goes straight to the operator's terminal.
        let status = Command::new(&self.tools.fetch)
            .arg("-O")
            .arg(dest)
            .arg(url)
            .status()
            .await
            .map_err(|e| fetch_err(FetchCause::Spawn(e.to_string())))?;

        if !status.success() {
            remove_partial(dest).await;
            return Err(fetch_err(classify_fetch_failure(status)));
        }

        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(fetch_err(FetchCause::Missing));
        }

        debug!(url, dest = %dest.display(), "Fetched image");
        Ok(())
    }

    async fn mount_loop(&self, image: &Path, fs_type: &str, target: &Path) -> VmStageResult<()> {
        let output = Command::new(&self.tools.mount)
            .args(["-t", fs_type, "-o", "loop"])
            .arg(image)
            .arg(target)
            .output()
            .await
            .map_err(|e| VmStageError::Mount {
                image: image.to_path_buf(),
                cause: MountCause::Tool(format!("failed to run {}: {}", self.tools.mount, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VmStageError::Mount {
                image: image.to_path_buf(),
                cause: classify_mount_failure(&stderr),
            });
        }

        debug!(
            image = %image.display(),
            target = %target.display(),
            fs_type,
            "Loop mount created"
        );
        Ok(())
    }

    async fn copy(&self, source: &Path, dest: &Path) -> VmStageResult<u64> {
        copy_file(source, dest).await
    }

    async fn unmount(&self, target: &Path) -> VmStageResult<()> {
        let output = Command::new(&self.tools.umount)
            .arg(target)
            .output()
            .await
            .map_err(|e| VmStageError::Unmount {
                target: target.to_path_buf(),
                reason: format!("failed to run {}: {}", self.tools.umount, e),
            })?;

        if !output.status.success() {
            return Err(VmStageError::Unmount {
                target: target.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(target = %target.display(), "Loop mount unmounted");
        Ok(())
    }

    fn detach(&self, target: &Path) -> VmStageResult<()> {
        umount2(target, MntFlags::MNT_DETACH).map_err(|e| VmStageError::Unmount {
            target: target.to_path_buf(),
            reason: format!("lazy detach failed: {}", e),
        })
    }

    fn launch(&self, spec: &LaunchSpec) -> VmStageResult<Box<dyn VmHandle>> {
        // Dropping the Child neither kills nor waits on the emulator.
        let child = spawn_detached(&spec.program, &spec.args, &spec.cwd)?;
        Ok(Box::new(QemuHandler::new(child.id(), spec.program.clone())))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// wget truncates the destination before the transfer starts.
async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => debug!(dest = %dest.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dest = %dest.display(), error = %e, "Failed to remove partial download"),
    }
}

fn classify_fetch_failure(status: ExitStatus) -> FetchCause {
    match status.code() {
        Some(WGET_NETWORK_FAILURE) | Some(WGET_SSL_FAILURE) => FetchCause::Network,
        Some(WGET_SERVER_ERROR) => FetchCause::Http,
        code => FetchCause::Tool(code),
    }
}

fn classify_mount_failure(stderr: &str) -> MountCause {
    if stderr.to_ascii_lowercase().contains("busy") {
        MountCause::DeviceBusy
    } else {
        MountCause::Tool(stderr.trim().to_string())
    }
}
