//! vmstage: prepare and boot a QEMU guest for kernel-module testing.
//!
//! A run fetches the guest images, stages build artifacts into the root
//! image through a loop mount, and starts the emulator detached.
//!
//! ```ignore
//! use std::sync::Arc;
//! use vmstage::{StageConfig, SystemHost, run, util::effective_uid};
//!
//! let config = StageConfig::default();
//! let host = Arc::new(SystemHost::new(config.tools.clone()));
//! let outcome = run(host, config, effective_uid()).await?;
//! println!("emulator pid {}", outcome.vm.pid());
//! ```

pub mod config;
pub mod constants;
pub mod fs;
pub mod host;
pub mod logging;
pub mod pipeline;
pub mod staging;
pub mod util;
pub mod vmm;

pub use config::StageConfig;
pub use host::{HostOps, SystemHost};
pub use staging::{RunOutcome, run};
pub use vmm::{QemuCommand, VmHandle};
pub use vmstage_shared::{VmStageError, VmStageResult};
