// ============================================================
// Layer 6 — Image <-> Tensor Conversion
// ============================================================
// Images live in the `image` crate's HWC layout; the network
// consumes NCHW float tensors in [0, 1]. These helpers move
// pixels between the two and write restored images to disk.

use anyhow::{Context, Result};
use burn::prelude::*;
use image::{Rgb, Rgb32FImage, RgbImage};
use std::{fs, path::Path};

/// HWC u8 → CHW f32 in [0, 1].
pub fn rgb_to_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut out = vec![0.0f32; 3 * plane];
    for (x, y, px) in img.enumerate_pixels() {
        let idx = (y * w + x) as usize;
        for c in 0..3 {
            out[c * plane + idx] = px[c] as f32 / 255.0;
        }
    }
    out
}

/// Split an [N, 3, H, W] tensor into N float RGB images, clamped to [0, 1].
pub fn tensor_to_images<B: Backend>(tensor: Tensor<B, 4>) -> Result<Vec<Rgb32FImage>> {
    let [n, c, h, w] = tensor.dims();
    anyhow::ensure!(c == 3, "expected 3 channels, got {c}");

    let data: Vec<f32> = tensor
        .clamp(0.0, 1.0)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("cannot read tensor data: {e:?}"))?;

    let plane = h * w;
    let images = (0..n)
        .map(|b| {
            let base = b * 3 * plane;
            Rgb32FImage::from_fn(w as u32, h as u32, |x, y| {
                let idx = y as usize * w + x as usize;
                Rgb([
                    data[base + idx],
                    data[base + plane + idx],
                    data[base + 2 * plane + idx],
                ])
            })
        })
        .collect();
    Ok(images)
}

/// Quantise a float image to 8-bit RGB.
pub fn to_rgb8(img: &Rgb32FImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let px = img.get_pixel(x, y);
        Rgb([quantise(px[0]), quantise(px[1]), quantise(px[2])])
    })
}

fn quantise(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Write one restored image; the format follows the file extension.
pub fn save_image(img: &Rgb32FImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    to_rgb8(img)
        .save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))?;
    tracing::debug!("Saved result image '{}'", path.display());
    Ok(())
}
