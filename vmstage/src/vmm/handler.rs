//! VmHandle - Runtime operations on a launched VM.

use crate::util::{is_process_alive, is_same_process, terminate_process};
use vmstage_shared::errors::{VmStageError, VmStageResult};

/// Trait for runtime operations on a detached VM process.
///
/// The launcher hands this back instead of forgetting the process, so a
/// caller can choose to track or terminate the guest.
pub trait VmHandle: Send {
    /// Process ID of the emulator.
    fn pid(&self) -> u32;

    /// Check if the emulator is still running.
    fn is_running(&self) -> bool;

    /// Ask the emulator to terminate.
    fn stop(&mut self) -> VmStageResult<()>;
}

/// Handle to a detached emulator process identified by PID.
pub struct QemuHandler {
    pid: u32,
    program: String,
}

impl QemuHandler {
    pub fn new(pid: u32, program: impl Into<String>) -> Self {
        Self {
            pid,
            program: program.into(),
        }
    }
}

impl VmHandle for QemuHandler {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_running(&self) -> bool {
        is_process_alive(self.pid) && is_same_process(self.pid, &self.program)
    }

    fn stop(&mut self) -> VmStageResult<()> {
        if !self.is_running() {
            return Ok(());
        }
        if terminate_process(self.pid) {
            tracing::info!(pid = self.pid, "Sent SIGTERM to emulator");
            Ok(())
        } else {
            Err(VmStageError::InvalidState(format!(
                "Failed to signal emulator process {}",
                self.pid
            )))
        }
    }
}
