//! Loop mount handle with RAII cleanup.

use super::{LoopMountConfig, validate_config};
use crate::host::HostOps;
use std::path::{Path, PathBuf};
use vmstage_shared::errors::VmStageResult;

/// Handle to an active loop mount.
///
/// Release it with [`LoopMount::release`]. A handle dropped while still
/// mounted (early return, panic) lazily detaches the mount instead.
pub struct LoopMount<'h> {
    host: &'h dyn HostOps,
    image: PathBuf,
    target: PathBuf,
    mounted: bool,
}

impl<'h> LoopMount<'h> {
    /// Mount `config.image` at `config.target`.
    pub async fn acquire(host: &'h dyn HostOps, config: &LoopMountConfig<'_>) -> VmStageResult<Self> {
        validate_config(config)?;
        host.mount_loop(config.image, config.fs_type, config.target)
            .await?;

        tracing::info!(
            image = %config.image.display(),
            target = %config.target.display(),
            "Mounted image"
        );

        Ok(Self {
            host,
            image: config.image.to_path_buf(),
            target: config.target.to_path_buf(),
            mounted: true,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Unmount. Exactly one unmount attempt is made; on failure the handle
    /// is consumed without a second try.
    pub async fn release(mut self) -> VmStageResult<()> {
        self.mounted = false;
        self.host.unmount(&self.target).await?;
        tracing::info!(target = %self.target.display(), "Unmounted image");
        Ok(())
    }
}

impl Drop for LoopMount<'_> {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::warn!(
            target = %self.target.display(),
            "Loop mount dropped without release, detaching"
        );
        if let Err(e) = self.host.detach(&self.target) {
            tracing::warn!(error = %e, "Failed to detach loop mount on drop");
        }
    }
}
