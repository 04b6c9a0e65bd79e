//! Built-in defaults for the RAM-disk test environment.
//!
//! Centralized location for every literal the staging run depends on.
//! `StageConfig::default()` is assembled from these.

/// Image Set and its remote source.
pub mod images {
    /// Remote directory holding the prebuilt images (trailing slash required)
    pub const BASE_URL: &str = "https://rogerpease.com/LinuxKernelSimpleRamDisk/";

    /// Yocto root filesystem image; also the image the artifacts are staged into
    pub const ROOT_IMAGE: &str = "core-image-minimal-qemux86.ext4";

    /// Scratch disks exercised by the RAM-disk driver tests
    pub const SCRATCH_DISKS: [&str; 2] = ["disk1.img", "disk2.img"];

    /// Guest kernel image
    pub const KERNEL_IMAGE: &str = "bzImage16_Linux6.8.0-rc7";
}

/// Artifact staging into the guest filesystem.
pub mod staging {
    /// Filesystem type of the root image
    pub const FS_TYPE: &str = "ext4";

    /// Destination inside the mounted image, relative to its root
    pub const GUEST_DIR: &str = "home/root";

    /// Build outputs copied into the guest, relative to the work directory
    pub const ARTIFACTS: [&str; 3] = [
        "../kernel/ram-disk-queue.ko",
        "../kernel/ram-disk-bio.ko",
        "../user/ram-disk-test",
    ];

    /// Prefix of the scoped mount point directory
    pub const MOUNT_DIR_PREFIX: &str = "vmstage-mnt-";
}

/// Emulator configuration.
pub mod launch {
    pub const EMULATOR: &str = "qemu-system-x86_64";

    pub const MEMORY_MIB: u32 = 256;

    /// Character device id of the virtio console
    pub const CONSOLE_ID: &str = "virtiocon0";

    pub const KERNEL_CMDLINE: &str = "root=/dev/vda loglevel=15 console=hvc0 pci=noacpi nokaslr";

    /// Host tap devices and the NIC model attached to each
    pub const NICS: [(&str, &str); 2] = [("lkt-tap0", "virtio"), ("lkt-tap1", "i82559er")];

    pub const DRIVE_INTERFACE: &str = "virtio";

    pub const DRIVE_FORMAT: &str = "raw";
}

/// External tools invoked on the host.
pub mod tools {
    pub const FETCH: &str = "wget";
    pub const MOUNT: &str = "mount";
    pub const UMOUNT: &str = "umount";
}

/// Environment variables read by the binary.
pub mod env {
    /// Directory for the persistent log file (unset: stderr only)
    pub const LOG_DIR: &str = "VMSTAGE_LOG_DIR";
}

/// Printed once the VM has been started.
pub const OPERATOR_INSTRUCTIONS: [&str; 2] = [
    "Login as root (no password), insmod one of the .ko modules and run ./ram-disk-test.",
    "rmmod the module once done and you can run the other if you want.",
];
