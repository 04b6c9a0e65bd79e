//! Loop mount configuration.

use std::path::Path;

/// Configuration for loop-mounting an image file.
#[derive(Debug, Clone)]
pub struct LoopMountConfig<'a> {
    pub image: &'a Path,
    pub target: &'a Path,
    pub fs_type: &'a str,
}

impl<'a> LoopMountConfig<'a> {
    pub fn new(image: &'a Path, target: &'a Path, fs_type: &'a str) -> Self {
        Self {
            image,
            target,
            fs_type,
        }
    }
}
