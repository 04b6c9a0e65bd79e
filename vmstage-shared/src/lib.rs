//! Types shared between the vmstage library and its binary.

pub mod errors;

pub use errors::{CopyCause, FetchCause, MountCause, VmStageError, VmStageResult};
