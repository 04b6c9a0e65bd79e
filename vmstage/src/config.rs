//! Staging run configuration.
//!
//! One `StageConfig` is built at process start (defaults, optionally
//! overridden by a JSON file) and passed by reference to every stage.

use crate::constants::{images, launch, staging, tools};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vmstage_shared::errors::{VmStageError, VmStageResult};

/// Complete configuration of one staging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Directory holding the Image Set. Artifact sources and drive files
    /// are resolved against it, and the emulator runs in it.
    pub work_dir: PathBuf,
    pub images: ImageSetConfig,
    pub update: UpdateConfig,
    pub launch: LaunchConfig,
    pub tools: ToolPaths,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            images: ImageSetConfig::default(),
            update: UpdateConfig::default(),
            launch: LaunchConfig::default(),
            tools: ToolPaths::default(),
        }
    }
}

/// Files that must exist locally before the image is updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSetConfig {
    /// Remote directory URL; each missing name is fetched from `base_url + name`.
    pub base_url: String,
    /// Ordered file names.
    pub names: Vec<String>,
}

impl Default for ImageSetConfig {
    fn default() -> Self {
        let mut names = vec![images::ROOT_IMAGE.to_string()];
        names.extend(images::SCRATCH_DISKS.iter().map(|s| s.to_string()));
        names.push(images::KERNEL_IMAGE.to_string());
        Self {
            base_url: images::BASE_URL.to_string(),
            names,
        }
    }
}

impl ImageSetConfig {
    pub fn url_for(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name)
    }
}

/// A build output staged into the guest filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub source: PathBuf,
    /// Guest directory relative to the image root; `UpdateConfig::guest_dir` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
}

impl ArtifactSpec {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: None,
        }
    }

    pub fn dest_dir<'a>(&'a self, default: &'a Path) -> &'a Path {
        self.dest.as_deref().unwrap_or(default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Image (a name from the Image Set) that receives the artifacts.
    pub image: String,
    pub fs_type: String,
    pub guest_dir: PathBuf,
    pub artifacts: Vec<ArtifactSpec>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            image: images::ROOT_IMAGE.to_string(),
            fs_type: staging::FS_TYPE.to_string(),
            guest_dir: PathBuf::from(staging::GUEST_DIR),
            artifacts: staging::ARTIFACTS.iter().map(|a| ArtifactSpec::new(*a)).collect(),
        }
    }
}

/// NIC attached to a pre-created host tap device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicConfig {
    /// Host interface name, also used as the netdev id.
    pub ifname: String,
    /// Emulated NIC model.
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveConfig {
    pub file: String,
    #[serde(default = "default_drive_interface")]
    pub interface: String,
    #[serde(default = "default_drive_format")]
    pub format: String,
}

fn default_drive_interface() -> String {
    launch::DRIVE_INTERFACE.to_string()
}

fn default_drive_format() -> String {
    launch::DRIVE_FORMAT.to_string()
}

impl DriveConfig {
    pub fn raw_virtio(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            interface: default_drive_interface(),
            format: default_drive_format(),
        }
    }
}

/// Static description of the virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub emulator: String,
    pub kernel: String,
    pub memory_mib: u32,
    /// Open the gdb stub on tcp::1234 (`-s`).
    pub gdb_stub: bool,
    /// Chardev id of the virtio console, `None` for no console device.
    pub console_id: Option<String>,
    pub nics: Vec<NicConfig>,
    pub drives: Vec<DriveConfig>,
    pub kernel_cmdline: String,
    /// Lines printed for the operator after launch.
    pub instructions: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        let mut drives = vec![DriveConfig::raw_virtio(images::ROOT_IMAGE)];
        drives.extend(images::SCRATCH_DISKS.iter().map(|d| DriveConfig::raw_virtio(*d)));

        Self {
            emulator: launch::EMULATOR.to_string(),
            kernel: images::KERNEL_IMAGE.to_string(),
            memory_mib: launch::MEMORY_MIB,
            gdb_stub: true,
            console_id: Some(launch::CONSOLE_ID.to_string()),
            nics: launch::NICS
                .iter()
                .map(|(ifname, model)| NicConfig {
                    ifname: ifname.to_string(),
                    model: model.to_string(),
                })
                .collect(),
            drives,
            kernel_cmdline: launch::KERNEL_CMDLINE.to_string(),
            instructions: crate::constants::OPERATOR_INSTRUCTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Host tools the system host shells out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub fetch: String,
    pub mount: String,
    pub umount: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            fetch: tools::FETCH.to_string(),
            mount: tools::MOUNT.to_string(),
            umount: tools::UMOUNT.to_string(),
        }
    }
}

impl StageConfig {
    /// Load a configuration file. Missing fields fall back to the defaults.
    pub fn load(path: &Path) -> VmStageResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VmStageError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: StageConfig = serde_json::from_str(&raw).map_err(|e| {
            VmStageError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.sanitize()?;
        Ok(config)
    }

    /// Resolve a path from the configuration against the work directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// Validate cross-field invariants.
    pub fn sanitize(&self) -> VmStageResult<()> {
        let images = &self.images;
        if images.names.is_empty() {
            return Err(VmStageError::Config("Image set is empty".into()));
        }
        if !images.base_url.ends_with('/') {
            return Err(VmStageError::Config(format!(
                "Image base URL must end with '/': {}",
                images.base_url
            )));
        }
        let known: HashSet<&str> = images.names.iter().map(String::as_str).collect();
        if known.len() != images.names.len() {
            return Err(VmStageError::Config("Image set lists a name twice".into()));
        }
        if !known.contains(self.update.image.as_str()) {
            return Err(VmStageError::Config(format!(
                "Update image {} is not in the image set",
                self.update.image
            )));
        }

        if self.update.artifacts.is_empty() {
            return Err(VmStageError::Config("Artifact list is empty".into()));
        }
        let guest_dirs = std::iter::once(self.update.guest_dir.as_path()).chain(
            self.update
                .artifacts
                .iter()
                .filter_map(|a| a.dest.as_deref()),
        );
        for dir in guest_dirs {
            if dir.is_absolute() {
                return Err(VmStageError::Config(format!(
                    "Guest directory must be relative to the image root: {}",
                    dir.display()
                )));
            }
        }

        let launch = &self.launch;
        if launch.memory_mib == 0 {
            return Err(VmStageError::Config("memory_mib must be positive".into()));
        }
        for drive in &launch.drives {
            if !known.contains(drive.file.as_str()) {
                return Err(VmStageError::Config(format!(
                    "Drive {} is not in the image set",
                    drive.file
                )));
            }
        }
        let mut ifnames = HashSet::new();
        for nic in &launch.nics {
            if !ifnames.insert(nic.ifname.as_str()) {
                return Err(VmStageError::Config(format!(
                    "Tap device {} is used twice",
                    nic.ifname
                )));
            }
        }

        Ok(())
    }
}
