//! vmstage - fetch guest images, stage test artifacts, boot the VM.
//!
//! Must run as root (loop mounts). The emulator keeps running after this
//! process exits.

use clap::Parser;
use nix::unistd::Uid;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use vmstage::staging::FetchOutcome;
use vmstage::util::{effective_uid, ensure_root};
use vmstage::{QemuCommand, StageConfig, SystemHost, VmStageError, VmStageResult, logging};

#[derive(Parser, Debug)]
#[command(name = "vmstage", version, about = "Stage kernel-module tests into a QEMU guest and boot it")]
struct Args {
    /// JSON file overriding the built-in configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the guest images
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Print the emulator command line and exit without touching the host
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Only the inspection flags may run unprivileged.
    fn requires_root(&self) -> bool {
        !(self.dry_run || self.print_config)
    }
}

/// Process exit status and the message that goes with it.
#[derive(Debug, PartialEq, Eq)]
struct Exit {
    status: u8,
    stdout: Option<String>,
    stderr: Option<String>,
}

fn exit_for(result: &VmStageResult<()>) -> Exit {
    match result {
        Ok(()) => Exit {
            status: 0,
            stdout: None,
            stderr: None,
        },
        Err(VmStageError::NotRoot) => Exit {
            status: 1,
            stdout: Some(VmStageError::NotRoot.to_string()),
            stderr: None,
        },
        Err(e) => Exit {
            status: 1,
            stdout: None,
            stderr: Some(format!("vmstage: {}", e)),
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = logging::init();

    let result = run(args, effective_uid()).await;
    match &result {
        Ok(()) | Err(VmStageError::NotRoot) => {}
        Err(e) => tracing::error!(error = %e, "Staging failed"),
    }

    let exit = exit_for(&result);
    if let Some(line) = exit.stdout {
        println!("{}", line);
    }
    if let Some(line) = exit.stderr {
        eprintln!("{}", line);
    }
    ExitCode::from(exit.status)
}

async fn run(args: Args, euid: Uid) -> VmStageResult<()> {
    if args.requires_root() {
        ensure_root(euid)?;
    }

    let mut config = match args.config {
        Some(ref path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(work_dir) = args.work_dir {
        config.work_dir = work_dir;
    }

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if args.dry_run {
        config.sanitize()?;
        println!("{}", QemuCommand::from_config(&config.launch));
        return Ok(());
    }

    let host = Arc::new(SystemHost::new(config.tools.clone()));
    let outcome = vmstage::run(host, config, euid).await?;

    tracing::info!(
        pid = outcome.vm.pid(),
        downloaded = outcome.fetch.count(FetchOutcome::Downloaded),
        staged = outcome.update.staged.len(),
        "Guest launched"
    );
    Ok(())
}
