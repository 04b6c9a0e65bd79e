//! Recording host for tests.
//!
//! Downloads create small placeholder files, mounts only record the call,
//! copies are real (into the scratch mount directory). Each operation can
//! be told to fail.

use super::{HostOps, LaunchSpec, copy_file};
use crate::vmm::VmHandle;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use vmstage_shared::errors::{FetchCause, MountCause, VmStageError, VmStageResult};

pub(crate) const FAKE_PID: u32 = 4242;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
    Fetch { url: String, dest: PathBuf },
    Mount { image: PathBuf, fs_type: String, target: PathBuf },
    Copy { source: PathBuf, dest: PathBuf },
    Unmount { target: PathBuf },
    Detach { target: PathBuf },
    Launch(LaunchSpec),
}

#[derive(Default)]
pub(crate) struct FakeHost {
    pub calls: Mutex<Vec<HostCall>>,
    pub fetch_failures: HashMap<String, FetchCause>,
    pub mount_failure: Option<MountCause>,
    pub unmount_fails: bool,
    pub detach_fails: bool,
    pub launch_fails: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Fetch { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Short names of the calls in order ("fetch", "mount", ...).
    pub fn call_kinds(&self) -> Vec<&'static str> {
        self.calls()
            .iter()
            .map(|c| match c {
                HostCall::Fetch { .. } => "fetch",
                HostCall::Mount { .. } => "mount",
                HostCall::Copy { .. } => "copy",
                HostCall::Unmount { .. } => "unmount",
                HostCall::Detach { .. } => "detach",
                HostCall::Launch(_) => "launch",
            })
            .collect()
    }

    pub fn launched(&self) -> Option<LaunchSpec> {
        self.calls().into_iter().find_map(|c| match c {
            HostCall::Launch(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn mount_target(&self) -> Option<PathBuf> {
        self.calls().into_iter().find_map(|c| match c {
            HostCall::Mount { target, .. } => Some(target),
            _ => None,
        })
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostOps for FakeHost {
    async fn fetch(&self, url: &str, dest: &Path) -> VmStageResult<()> {
        self.record(HostCall::Fetch {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        let name = dest.file_name().unwrap().to_string_lossy().into_owned();
        if let Some(cause) = self.fetch_failures.get(&name) {
            return Err(VmStageError::Fetch {
                name,
                url: url.to_string(),
                cause: cause.clone(),
            });
        }
        tokio::fs::write(dest, b"image").await?;
        Ok(())
    }

    async fn mount_loop(&self, image: &Path, fs_type: &str, target: &Path) -> VmStageResult<()> {
        self.record(HostCall::Mount {
            image: image.to_path_buf(),
            fs_type: fs_type.to_string(),
            target: target.to_path_buf(),
        });
        match &self.mount_failure {
            Some(cause) => Err(VmStageError::Mount {
                image: image.to_path_buf(),
                cause: cause.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn copy(&self, source: &Path, dest: &Path) -> VmStageResult<u64> {
        self.record(HostCall::Copy {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        copy_file(source, dest).await
    }

    async fn unmount(&self, target: &Path) -> VmStageResult<()> {
        self.record(HostCall::Unmount {
            target: target.to_path_buf(),
        });
        if self.unmount_fails {
            return Err(VmStageError::Unmount {
                target: target.to_path_buf(),
                reason: "target is busy".into(),
            });
        }
        Ok(())
    }

    fn detach(&self, target: &Path) -> VmStageResult<()> {
        self.record(HostCall::Detach {
            target: target.to_path_buf(),
        });
        if self.detach_fails {
            return Err(VmStageError::Unmount {
                target: target.to_path_buf(),
                reason: "lazy detach failed".into(),
            });
        }
        Ok(())
    }

    fn launch(&self, spec: &LaunchSpec) -> VmStageResult<Box<dyn VmHandle>> {
        self.record(HostCall::Launch(spec.clone()));
        if self.launch_fails {
            return Err(VmStageError::Launch(format!("{}: not found", spec.program)));
        }
        Ok(Box::new(FakeVm { running: true }))
    }
}

pub(crate) struct FakeVm {
    running: bool,
}

impl VmHandle for FakeVm {
    fn pid(&self) -> u32 {
        FAKE_PID
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn stop(&mut self) -> VmStageResult<()> {
        self.running = false;
        Ok(())
    }
}
