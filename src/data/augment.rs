//! Paired image transforms.
//!
//! Every geometric op is applied identically to input and target so the
//! pixel correspondence the loss relies on is preserved.

use image::{imageops, imageops::FilterType, RgbImage};
use rand::Rng;

use crate::domain::sample::PatchSize;

/// Upscale both images (keeping aspect ratio) until the patch fits inside.
fn cover_patch(input: RgbImage, target: RgbImage, patch: PatchSize) -> (RgbImage, RgbImage) {
    let (w, h) = input.dimensions();
    if w >= patch.width && h >= patch.height {
        return (input, target);
    }
    let scale = (patch.width as f32 / w as f32).max(patch.height as f32 / h as f32);
    let new_w = ((w as f32 * scale).ceil() as u32).max(patch.width);
    let new_h = ((h as f32 * scale).ceil() as u32).max(patch.height);
    (
        imageops::resize(&input, new_w, new_h, FilterType::Triangle),
        imageops::resize(&target, new_w, new_h, FilterType::Triangle),
    )
}

/// Cut the same random `patch` window out of both images.
///
/// Targets whose size differs from the input are resized to the input first.
pub fn paired_random_crop(
    input:  RgbImage,
    target: RgbImage,
    patch:  PatchSize,
    rng:    &mut impl Rng,
) -> (RgbImage, RgbImage) {
    let target = match_size(&input, target);
    let (input, target) = cover_patch(input, target, patch);

    let (w, h) = input.dimensions();
    let x = rng.gen_range(0..=w - patch.width);
    let y = rng.gen_range(0..=h - patch.height);

    (
        imageops::crop_imm(&input, x, y, patch.width, patch.height).to_image(),
        imageops::crop_imm(&target, x, y, patch.width, patch.height).to_image(),
    )
}

/// Independent horizontal and vertical flips, each with probability 0.5.
pub fn paired_random_flip(input: &mut RgbImage, target: &mut RgbImage, rng: &mut impl Rng) {
    if rng.gen_bool(0.5) {
        imageops::flip_horizontal_in_place(input);
        imageops::flip_horizontal_in_place(target);
    }
    if rng.gen_bool(0.5) {
        imageops::flip_vertical_in_place(input);
        imageops::flip_vertical_in_place(target);
    }
}

/// Deterministic resize of both images to exactly `patch`.
pub fn resize_pair(input: &RgbImage, target: &RgbImage, patch: PatchSize) -> (RgbImage, RgbImage) {
    (
        imageops::resize(input, patch.width, patch.height, FilterType::Triangle),
        imageops::resize(target, patch.width, patch.height, FilterType::Triangle),
    )
}

/// Bring `target` to the input's dimensions if they disagree.
pub fn match_size(input: &RgbImage, target: RgbImage) -> RgbImage {
    if input.dimensions() == target.dimensions() {
        return target;
    }
    let (w, h) = input.dimensions();
    tracing::debug!(
        "Resizing target {:?} to input size {}x{}",
        target.dimensions(),
        w,
        h
    );
    imageops::resize(&target, w, h, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::{rngs::StdRng, SeedableRng};

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]))
    }

    #[test]
    fn test_crop_is_aligned() {
        let mut rng = StdRng::seed_from_u64(1);
        let img = gradient(40, 30);
        let (a, b) = paired_random_crop(img.clone(), img, PatchSize::new(16, 8), &mut rng);
        assert_eq!(a.dimensions(), (16, 8));
        // Same source image and same window → identical crops
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_images_are_upscaled_before_crop() {
        let mut rng = StdRng::seed_from_u64(2);
        let (a, b) = paired_random_crop(gradient(10, 6), gradient(10, 6), PatchSize::new(16, 16), &mut rng);
        assert_eq!(a.dimensions(), (16, 16));
        assert_eq!(b.dimensions(), (16, 16));
    }

    #[test]
    fn test_flip_keeps_pair_aligned() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..8 {
            let mut a = gradient(5, 4);
            let mut b = gradient(5, 4);
            paired_random_flip(&mut a, &mut b, &mut rng);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_resize_pair_and_match_size() {
        let (a, b) = resize_pair(&gradient(20, 10), &gradient(20, 10), PatchSize::new(8, 4));
        assert_eq!(a.dimensions(), (8, 4));
        assert_eq!(b.dimensions(), (8, 4));

        let fixed = match_size(&gradient(12, 9), gradient(6, 3));
        assert_eq!(fixed.dimensions(), (12, 9));
    }
}
