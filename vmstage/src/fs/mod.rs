//! Filesystem utilities for host-side operations.

mod loop_mount;

pub use loop_mount::{LoopMount, LoopMountConfig};
