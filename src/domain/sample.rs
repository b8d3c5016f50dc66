// ============================================================
// Layer 3 — Image Pair Domain Types
// ============================================================
// A training or evaluation sample is a degraded underwater
// image (the input) and its reference restoration (the target).
// Both files share the same file name in sibling directories.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One input/target pair on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePair {
    /// Shared file name, also used for the restored output image
    pub name: String,

    /// Degraded underwater image
    pub input: PathBuf,

    /// Reference image
    pub target: PathBuf,
}

impl ImagePair {
    pub fn new(name: impl Into<String>, input: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            name:   name.into(),
            input:  input.into(),
            target: target.into(),
        }
    }
}

/// Which pipeline a dataset feeds.
///
/// `Train` draws random aligned crops and flips; `Test` is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    Train,
    Test,
}

/// Width and height of the crop (train) or resize target (test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSize {
    pub width:  u32,
    pub height: u32,
}

impl PatchSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch() {
        assert!(PatchSize::new(0, 8).is_empty());
        assert!(PatchSize::new(8, 0).is_empty());
        assert!(!PatchSize::new(8, 8).is_empty());
    }
}
