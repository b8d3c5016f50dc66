//! Running averages of the quality metrics over a loader pass.

use anyhow::Result;
use burn::prelude::*;
use image::Rgb32FImage;

use crate::infra::image_io::tensor_to_images;
use crate::infra::metrics::QualityStats;
use crate::quality::{
    lpips::Lpips,
    reference::{psnr, ssim},
    uciqe::Uciqe,
    uiqm::Uiqm,
    NoReferenceMetric,
};

/// Accumulates per-batch PSNR, SSIM, LPIPS, UCIQE and UIQM.
///
/// Each batch contributes one value per metric; `finish` divides by the
/// number of batches, i.e. the loader length.
pub struct QualityMeter<B: Backend> {
    lpips:   Option<Lpips<B>>,
    sums:    QualityStats,
    batches: usize,
    samples: usize,
}

impl<B: Backend> QualityMeter<B> {
    pub fn new(lpips: Option<Lpips<B>>) -> Self {
        let sums = QualityStats {
            lpips: lpips.as_ref().map(|_| 0.0),
            ..Default::default()
        };
        Self { lpips, sums, batches: 0, samples: 0 }
    }

    /// Score one batch of restored images against their references.
    ///
    /// Returns the restored images so callers can write them out.
    pub fn update(&mut self, res: Tensor<B, 4>, tar: Tensor<B, 4>) -> Result<Vec<Rgb32FImage>> {
        self.sums.psnr += psnr(res.clone(), tar.clone(), 1.0);
        self.sums.ssim += ssim(res.clone(), tar.clone(), 1.0).into_scalar().elem::<f64>();

        if let (Some(lpips), Some(sum)) = (&self.lpips, self.sums.lpips.as_mut()) {
            *sum += lpips.distance(res.clone(), tar)?.into_scalar().elem::<f64>();
        }

        let images = tensor_to_images(res)?;
        self.sums.uciqe += Uciqe.batch(&images);
        self.sums.uiqm  += Uiqm.batch(&images);
        self.batches += 1;
        self.samples += images.len();
        Ok(images)
    }

    /// Images scored so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Averages over all batches seen; all zeros if none were.
    pub fn finish(&self) -> QualityStats {
        if self.batches == 0 {
            return QualityStats { lpips: self.sums.lpips.map(|_| 0.0), ..Default::default() };
        }
        let n = self.batches as f64;
        QualityStats {
            psnr:  self.sums.psnr / n,
            ssim:  self.sums.ssim / n,
            lpips: self.sums.lpips.map(|v| v / n),
            uciqe: self.sums.uciqe / n,
            uiqm:  self.sums.uiqm / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_averages_over_batches() {
        let device = Default::default();
        let mut meter = QualityMeter::<B>::new(None);

        let tar = Tensor::<B, 4>::zeros([1, 3, 12, 12], &device).add_scalar(0.5);
        // error 0.1 → 20 dB, error 0.01 → 40 dB
        meter.update(tar.clone().add_scalar(0.1), tar.clone()).unwrap();
        let images = meter.update(tar.clone().add_scalar(0.01), tar).unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(meter.samples(), 2);

        let stats = meter.finish();
        assert!((stats.psnr - 30.0).abs() < 1e-2, "psnr {}", stats.psnr);
        assert!(stats.lpips.is_none());
        assert!(stats.ssim > 0.9);
    }

    #[test]
    fn test_empty_meter() {
        let meter = QualityMeter::<B>::new(None);
        assert_eq!(meter.finish(), QualityStats::default());
    }
}
