//! Subprocess spawning for the emulator.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use vmstage_shared::errors::{VmStageError, VmStageResult};

/// Spawn the emulator detached from the launcher.
///
/// The child gets its own process group so a Ctrl-C aimed at the launcher
/// does not reach the guest. stdout/stderr stay attached so the operator
/// sees the pty the console was redirected to.
///
/// # Arguments
/// * `program` - Emulator binary, resolved through `PATH`
/// * `args` - Full argument vector
/// * `cwd` - Directory the image file names are relative to
pub(crate) fn spawn_detached(program: &str, args: &[String], cwd: &Path) -> VmStageResult<Child> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    cmd.spawn().map_err(|e| {
        let err_msg = format!("Failed to spawn {} in {}: {}", program, cwd.display(), e);
        tracing::error!("{}", err_msg);
        VmStageError::Launch(err_msg)
    })
}
