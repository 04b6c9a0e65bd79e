//! Host side effects behind one capability interface.
//!
//! Every operation the staging run performs on the host (download, loop
//! mount, copy, unmount, emulator launch) goes through [`HostOps`]. The
//! production implementation shells out to the usual tools; tests swap in
//! a recording fake so the whole sequence runs without root, network or
//! a real image.

mod system;

#[cfg(test)]
pub(crate) mod fake;

pub use system::SystemHost;

use crate::vmm::VmHandle;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vmstage_shared::errors::{CopyCause, VmStageError, VmStageResult};

/// Emulator process to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[async_trait]
pub trait HostOps: Send + Sync {
    /// Download `url` to `dest`.
    ///
    /// On failure no file is left at `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> VmStageResult<()>;

    /// Loop-mount `image` with filesystem `fs_type` at `target`.
    async fn mount_loop(&self, image: &Path, fs_type: &str, target: &Path) -> VmStageResult<()>;

    /// Copy a single file. Returns the number of bytes written.
    async fn copy(&self, source: &Path, dest: &Path) -> VmStageResult<u64>;

    /// Unmount `target`.
    async fn unmount(&self, target: &Path) -> VmStageResult<()>;

    /// Lazily detach whatever is mounted at `target`.
    ///
    /// Synchronous so it can run from `Drop`.
    fn detach(&self, target: &Path) -> VmStageResult<()>;

    /// Start the emulator without waiting for it.
    fn launch(&self, spec: &LaunchSpec) -> VmStageResult<Box<dyn VmHandle>>;
}

/// Copy `source` to `dest`, failing with `SourceMissing` when the source is absent.
pub(crate) async fn copy_file(source: &Path, dest: &Path) -> VmStageResult<u64> {
    let copy_err = |cause| VmStageError::Copy {
        source_path: source.to_path_buf(),
        cause,
    };

    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(copy_err(CopyCause::Io("source is not a regular file".into())));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(copy_err(CopyCause::SourceMissing));
        }
        Err(e) => return Err(copy_err(CopyCause::Io(e.to_string()))),
    }

    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| copy_err(CopyCause::Io(format!("-> {}: {}", dest.display(), e))))
}
