//! Process helpers for the detached emulator.

/// Send SIGTERM to a process.
///
/// # Returns
/// * `true` - Signal delivered or process doesn't exist
/// * `false` - Failed to signal (permission denied)
pub fn terminate_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 || !is_process_alive(pid) }
}

/// Check if a process with the given PID exists.
///
/// Uses `libc::kill(pid, 0)` which sends a null signal to check existence.
///
/// # Returns
/// * `true` - Process exists
/// * `false` - Process does not exist or permission denied
pub fn is_process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

/// Verify that a PID still runs the given program.
///
/// Guards against PID reuse after the emulator has exited. Reads
/// `/proc/{pid}/cmdline` and compares the file name of argv[0].
pub fn is_same_process(pid: u32, program: &str) -> bool {
    use std::fs;
    use std::path::Path;

    let cmdline_path = format!("/proc/{}/cmdline", pid);
    let wanted = Path::new(program).file_name();

    match fs::read_to_string(&cmdline_path) {
        Ok(cmdline) => {
            // cmdline is null-separated
            let argv0 = cmdline.split('\0').next().unwrap_or_default();
            wanted.is_some() && Path::new(argv0).file_name() == wanted
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_current() {
        let current_pid = std::process::id();
        assert!(is_process_alive(current_pid));
    }

    #[test]
    fn test_is_process_alive_invalid() {
        // u32::MAX becomes -1 when cast to i32, which has special meaning in kill()
        assert!(!is_process_alive(999999999));
        assert!(!is_process_alive(888888888));
    }

    #[test]
    fn test_is_same_process_current() {
        let current_pid = std::process::id();
        let exe = std::env::current_exe().unwrap();
        let name = exe.file_name().unwrap().to_str().unwrap();

        assert!(is_same_process(current_pid, name));
        assert!(!is_same_process(current_pid, "qemu-system-x86_64"));
    }

    #[test]
    fn test_is_same_process_invalid() {
        assert!(!is_same_process(999999999, "qemu-system-x86_64"));
    }
}
