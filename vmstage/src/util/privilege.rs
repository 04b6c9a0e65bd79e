//! Privilege gate for loop mounts.

use nix::unistd::{Uid, geteuid};
use vmstage_shared::errors::{VmStageError, VmStageResult};

/// Effective user of the running process.
pub fn effective_uid() -> Uid {
    geteuid()
}

/// Fail with `NotRoot` unless `euid` is the superuser.
///
/// Loop mounts need root; without it `mount` fails opaquely halfway
/// through the run, so this runs before any other stage.
pub fn ensure_root(euid: Uid) -> VmStageResult<()> {
    if euid.is_root() {
        Ok(())
    } else {
        tracing::debug!(uid = euid.as_raw(), "Effective user is not root");
        Err(VmStageError::NotRoot)
    }
}
