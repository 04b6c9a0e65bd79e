//! Error types for vmstage.
//!
//! Every stage of the staging pipeline fails with a typed variant so the
//! root cause is reported where it happens, not three stages later as an
//! unrelated missing-file error.

use std::path::PathBuf;
use thiserror::Error;

pub type VmStageResult<T> = Result<T, VmStageError>;

/// Why an image retrieval failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// DNS, connect, TLS or transfer failure.
    Network,
    /// The server answered with an error status.
    Http,
    /// The retrieval tool reported success but no file was written.
    Missing,
    /// The retrieval tool failed for another reason (exit code, if any).
    Tool(Option<i32>),
    /// The retrieval tool could not be started.
    Spawn(String),
}

impl std::fmt::Display for FetchCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchCause::Network => write!(f, "network error"),
            FetchCause::Http => write!(f, "http error"),
            FetchCause::Missing => write!(f, "no file written"),
            FetchCause::Tool(Some(code)) => write!(f, "retrieval tool exited with {}", code),
            FetchCause::Tool(None) => write!(f, "retrieval tool killed by signal"),
            FetchCause::Spawn(msg) => write!(f, "retrieval tool did not start: {}", msg),
        }
    }
}

/// Why a loop mount failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountCause {
    DeviceBusy,
    Tool(String),
}

impl std::fmt::Display for MountCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountCause::DeviceBusy => write!(f, "device busy"),
            MountCause::Tool(msg) => write!(f, "{}", msg),
        }
    }
}

/// Why an artifact copy failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyCause {
    SourceMissing,
    Io(String),
}

impl std::fmt::Display for CopyCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyCause::SourceMissing => write!(f, "source missing"),
            CopyCause::Io(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum VmStageError {
    /// The effective user cannot perform loop mounts.
    #[error("Must be root")]
    NotRoot,

    #[error("fetch failed for {name} ({url}): {cause}")]
    Fetch {
        name: String,
        url: String,
        cause: FetchCause,
    },

    #[error("mount failed for {}: {cause}", image.display())]
    Mount { image: PathBuf, cause: MountCause },

    #[error("unmount failed for {}: {reason}", target.display())]
    Unmount { target: PathBuf, reason: String },

    /// `umount` failed and the mount was only lazily detached. The loop
    /// device may still be live, so the image must not be booted.
    #[error("{} was lazily detached after a failed unmount and may still be in use", image.display())]
    ImageInUse { image: PathBuf },

    #[error("copy failed for {}: {cause}", source_path.display())]
    Copy {
        source_path: PathBuf,
        cause: CopyCause,
    },

    #[error("launch failed: {0}")]
    Launch(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
