// ============================================================
// Image Quality Metrics
// ============================================================
// Full-reference metrics compare a restored image with its
// reference; no-reference metrics score the restored image on
// its own, which matters for underwater data where references
// are themselves imperfect.
//
//   reference.rs — PSNR and SSIM as Burn tensor ops (SSIM is
//                  differentiable and doubles as a loss term)
//   lpips.rs     — learned perceptual distance (AlexNet backbone)
//   uciqe.rs     — UCIQE, CIELab chroma/contrast/saturation blend
//   uiqm.rs      — UIQM, colourfulness + sharpness + contrast
//   colour.rs    — sRGB → CIELab conversion used by UCIQE

use image::Rgb32FImage;

pub mod colour;
pub mod lpips;
pub mod reference;
pub mod uciqe;
pub mod uiqm;

/// A metric computed from the restored image alone.
pub trait NoReferenceMetric {
    /// Score a single RGB image with values in [0, 1].
    fn score(&self, img: &Rgb32FImage) -> f64;

    /// Mean score over a batch; 0 for an empty batch.
    fn batch(&self, images: &[Rgb32FImage]) -> f64 {
        if images.is_empty() {
            return 0.0;
        }
        images.iter().map(|img| self.score(img)).sum::<f64>() / images.len() as f64
    }
}
