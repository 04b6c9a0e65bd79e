//! Emulator command construction and the detached VM process.
//!
//! - **QemuCommand**: argument vector built from a `LaunchConfig`
//! - **VmHandle**: runtime operations on the launched VM (pid, liveness, stop)
//!
//! The launcher never waits on the emulator. The handle is returned so a
//! caller may track or stop the VM; the binary simply logs its PID and exits.

mod args;
mod handler;
mod spawn;

pub use args::QemuCommand;
pub use handler::{QemuHandler, VmHandle};
pub(crate) use spawn::spawn_detached;
