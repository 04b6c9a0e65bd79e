//! Emulator argument vector.

use crate::config::LaunchConfig;
use std::fmt;

/// Fully resolved emulator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QemuCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl QemuCommand {
    /// Build the argument vector for `config`.
    ///
    /// Order: kernel, console, NICs, drives, gdb stub, memory, kernel command line.
    pub fn from_config(config: &LaunchConfig) -> Self {
        let mut args: Vec<String> = vec!["-kernel".into(), config.kernel.clone()];

        if let Some(ref id) = config.console_id {
            args.extend([
                "-device".into(),
                "virtio-serial".into(),
                "-chardev".into(),
                format!("pty,id={}", id),
                "-device".into(),
                format!("virtconsole,chardev={}", id),
            ]);
        }

        for nic in &config.nics {
            args.extend([
                "-netdev".into(),
                format!(
                    "tap,id={0},ifname={0},script=no,downscript=no",
                    nic.ifname
                ),
                "-net".into(),
                format!("nic,netdev={},model={}", nic.ifname, nic.model),
            ]);
        }

        for drive in &config.drives {
            args.extend([
                "-drive".into(),
                format!(
                    "file={},if={},format={}",
                    drive.file, drive.interface, drive.format
                ),
            ]);
        }

        if config.gdb_stub {
            args.push("-s".into());
        }
        args.extend([
            "-m".into(),
            config.memory_mib.to_string(),
            "--append".into(),
            config.kernel_cmdline.clone(),
        ]);

        Self {
            program: config.emulator.clone(),
            args,
        }
    }

    /// Values following each occurrence of `flag`.
    pub fn values_of<'a>(&'a self, flag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.args
            .windows(2)
            .filter(move |pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
    }
}

impl fmt::Display for QemuCommand {
    /// Shell-like rendering for dry runs and logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn default_command() -> QemuCommand {
        QemuCommand::from_config(&LaunchConfig::default())
    }

    #[test]
    fn test_default_argv_matches_fixed_literal() {
        let expected: Vec<&str> = vec![
            "-kernel",
            "bzImage16_Linux6.8.0-rc7",
            "-device",
            "virtio-serial",
            "-chardev",
            "pty,id=virtiocon0",
            "-device",
            "virtconsole,chardev=virtiocon0",
            "-netdev",
            "tap,id=lkt-tap0,ifname=lkt-tap0,script=no,downscript=no",
            "-net",
            "nic,netdev=lkt-tap0,model=virtio",
            "-netdev",
            "tap,id=lkt-tap1,ifname=lkt-tap1,script=no,downscript=no",
            "-net",
            "nic,netdev=lkt-tap1,model=i82559er",
            "-drive",
            "file=core-image-minimal-qemux86.ext4,if=virtio,format=raw",
            "-drive",
            "file=disk1.img,if=virtio,format=raw",
            "-drive",
            "file=disk2.img,if=virtio,format=raw",
            "-s",
            "-m",
            "256",
            "--append",
            "root=/dev/vda loglevel=15 console=hvc0 pci=noacpi nokaslr",
        ];

        let cmd = default_command();
        assert_eq!(cmd.program, "qemu-system-x86_64");
        assert_eq!(cmd.args, expected);
    }

    #[test]
    fn test_device_counts() {
        let cmd = default_command();

        assert_eq!(cmd.values_of("-drive").count(), 3);

        let taps: Vec<_> = cmd
            .values_of("-netdev")
            .filter(|v| v.starts_with("tap,"))
            .collect();
        assert_eq!(taps.len(), 2);

        let models: HashSet<_> = cmd
            .values_of("-net")
            .filter_map(|v| v.split(',').find_map(|kv| kv.strip_prefix("model=")))
            .collect();
        assert_eq!(models.len(), 2);

        assert_eq!(cmd.values_of("-m").collect::<Vec<_>>(), vec!["256"]);
        assert_eq!(cmd.args.iter().filter(|a| *a == "-s").count(), 1);
        assert_eq!(
            cmd.values_of("--append").collect::<Vec<_>>(),
            vec!["root=/dev/vda loglevel=15 console=hvc0 pci=noacpi nokaslr"]
        );
    }

    #[test]
    fn test_optional_devices_omitted() {
        let config = LaunchConfig {
            console_id: None,
            gdb_stub: false,
            nics: Vec::new(),
            ..LaunchConfig::default()
        };
        let cmd = QemuCommand::from_config(&config);

        assert!(!cmd.args.iter().any(|a| a == "-s"));
        assert_eq!(cmd.values_of("-chardev").count(), 0);
        assert_eq!(cmd.values_of("-netdev").count(), 0);
        assert_eq!(cmd.values_of("-drive").count(), 3);
    }

    #[test]
    fn test_display_quotes_cmdline() {
        let rendered = default_command().to_string();
        assert!(rendered.starts_with("qemu-system-x86_64 -kernel bzImage16_Linux6.8.0-rc7"));
        assert!(rendered.ends_with(
            "--append 'root=/dev/vda loglevel=15 console=hvc0 pci=noacpi nokaslr'"
        ));
    }
}
