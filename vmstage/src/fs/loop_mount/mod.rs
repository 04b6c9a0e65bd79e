//! Loop mount of a disk image onto a host directory.
//!
//! The mount itself is performed by the [`HostOps`](crate::host::HostOps)
//! capability; this module owns the scoped-resource discipline around it.

use vmstage_shared::errors::{VmStageError, VmStageResult};

pub use config::LoopMountConfig;
pub use handle::LoopMount;

mod config;
mod handle;

fn validate_config(config: &LoopMountConfig) -> VmStageResult<()> {
    if !config.image.is_file() {
        return Err(VmStageError::InvalidState(format!(
            "Image to mount does not exist: {}",
            config.image.display()
        )));
    }
    if !config.target.is_dir() {
        return Err(VmStageError::InvalidState(format!(
            "Mount point is not a directory: {}",
            config.target.display()
        )));
    }
    Ok(())
}
