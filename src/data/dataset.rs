use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::augment::{match_size, paired_random_crop, paired_random_flip, resize_pair};
use crate::data::loader::{open_rgb, DataError};
use crate::domain::sample::{ImagePair, PatchSize, SplitMode};
use crate::infra::image_io::rgb_to_chw;

/// One decoded pair, CHW float layout in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePairItem {
    pub input:  Vec<f32>,
    pub target: Vec<f32>,
    pub width:  usize,
    pub height: usize,
    pub name:   String,
}

/// Paired underwater images for Burn's DataLoader.
///
/// Train mode crops and flips; test mode either keeps the original
/// resolution or resizes to the patch size.
///
/// The augmentation RNG is derived from (seed, sample index, visit count),
/// so the n-th visit of a sample draws the same crop and flips whichever
/// loader worker fetches it.
pub struct PairedImageDataset {
    pairs:    Vec<ImagePair>,
    mode:     SplitMode,
    patch:    PatchSize,
    original: bool,
    seed:     u64,
    visits:   Vec<AtomicU64>,
}

impl PairedImageDataset {
    pub fn new(pairs: Vec<ImagePair>, mode: SplitMode, patch: PatchSize, original: bool, seed: u64) -> Self {
        let visits = pairs.iter().map(|_| AtomicU64::new(0)).collect();
        Self { pairs, mode, patch, original, seed, visits }
    }

    fn sample_rng(&self, index: usize) -> StdRng {
        let visit = self.visits[index].fetch_add(1, Ordering::Relaxed);
        let mixed = self.seed
            ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ visit.wrapping_add(1).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        StdRng::seed_from_u64(mixed)
    }

    fn load(&self, index: usize, pair: &ImagePair) -> Result<ImagePairItem, DataError> {
        let input  = open_rgb(&pair.input)?;
        let target = open_rgb(&pair.target)?;

        let (input, target) = match self.mode {
            SplitMode::Train => {
                let mut rng = self.sample_rng(index);
                let (mut inp, mut tar) = paired_random_crop(input, target, self.patch, &mut rng);
                paired_random_flip(&mut inp, &mut tar, &mut rng);
                (inp, tar)
            }
            SplitMode::Test if self.original => {
                let target = match_size(&input, target);
                (input, target)
            }
            SplitMode::Test => resize_pair(&input, &target, self.patch),
        };

        let (w, h) = input.dimensions();
        Ok(ImagePairItem {
            input:  rgb_to_chw(&input),
            target: rgb_to_chw(&target),
            width:  w as usize,
            height: h as usize,
            name:   pair.name.clone(),
        })
    }
}

/// Burn's loader ends a pass at the first `None` from `get`, so a pass that
/// saw fewer samples than the dataset holds hit an unreadable pair.
pub fn ensure_full_pass(split: &str, seen: usize, expected: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        seen == expected,
        "{split} pass loaded {seen} of {expected} samples; an image failed to decode (see the error log)"
    );
    Ok(())
}

impl Dataset<ImagePairItem> for PairedImageDataset {
    fn get(&self, index: usize) -> Option<ImagePairItem> {
        let pair = self.pairs.get(index)?;
        match self.load(index, pair) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::error!("Failed to load pair '{}': {}", pair.name, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{tests::write_pair, PairedImageSource};
    use crate::domain::traits::PairSource;

    fn dataset(mode: SplitMode, original: bool) -> (tempfile::TempDir, PairedImageDataset) {
        let tmp = tempfile::tempdir().unwrap();
        write_pair(tmp.path(), "a.png", 20, 14, 40);
        write_pair(tmp.path(), "b.png", 20, 14, 90);
        let pairs = PairedImageSource::new(tmp.path(), "input", "target").pairs().unwrap();
        let ds = PairedImageDataset::new(pairs, mode, PatchSize::new(8, 6), original, 11);
        (tmp, ds)
    }

    #[test]
    fn test_train_items_are_patch_sized() {
        let (_tmp, ds) = dataset(SplitMode::Train, false);
        assert_eq!(ds.len(), 2);
        let item = ds.get(0).unwrap();
        assert_eq!((item.width, item.height), (8, 6));
        assert_eq!(item.input.len(), 3 * 8 * 6);
        assert_eq!(item.target.len(), item.input.len());
        assert!(item.input.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_test_mode_original_and_resized() {
        let (_tmp, ds) = dataset(SplitMode::Test, true);
        let item = ds.get(1).unwrap();
        assert_eq!((item.width, item.height), (20, 14));
        assert_eq!(item.name, "b.png");

        let (_tmp, ds) = dataset(SplitMode::Test, false);
        let item = ds.get(0).unwrap();
        assert_eq!((item.width, item.height), (8, 6));
    }

    #[test]
    fn test_augmentation_ignores_fetch_order() {
        let (_tmp, first) = dataset(SplitMode::Train, false);
        let (_tmp2, second) = dataset(SplitMode::Train, false);

        // Different interleavings across samples, same per-sample visit order
        let a0 = first.get(0).unwrap();
        let b0 = first.get(1).unwrap();
        let b1 = first.get(1).unwrap();

        let b0_again = second.get(1).unwrap();
        let b1_again = second.get(1).unwrap();
        let a0_again = second.get(0).unwrap();

        assert_eq!(a0.input, a0_again.input);
        assert_eq!(b0.input, b0_again.input);
        assert_eq!(b1.target, b1_again.target);
    }

    #[test]
    fn test_short_pass_is_reported() {
        assert!(ensure_full_pass("test", 3, 3).is_ok());
        let err = ensure_full_pass("test", 1, 3).unwrap_err();
        assert!(err.to_string().contains("1 of 3"));
    }

    #[test]
    fn test_out_of_range_index() {
        let (_tmp, ds) = dataset(SplitMode::Test, true);
        assert!(ds.get(5).is_none());
    }
}
