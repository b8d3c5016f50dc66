// ============================================================
// UCIQE — Underwater Colour Image Quality Evaluation
// ============================================================
// No-reference metric (Yang & Sowmya, 2015), a linear blend of
// three CIELab statistics:
//
//   σc   — standard deviation of chroma  √(a² + b²)
//   conL — luminance contrast: mean of the brightest 1% of L
//          minus mean of the darkest 1%
//   μs   — mean saturation, chroma / L over pixels with L > 0
//
//   UCIQE = 0.4680·σc + 0.2745·conL + 0.2576·μs

use image::Rgb32FImage;

use crate::quality::colour::rgb_to_lab;
use crate::quality::NoReferenceMetric;

const C_CHROMA:     f64 = 0.4680;
const C_CONTRAST:   f64 = 0.2745;
const C_SATURATION: f64 = 0.2576;

#[derive(Debug, Clone, Copy, Default)]
pub struct Uciqe;

impl NoReferenceMetric for Uciqe {
    fn score(&self, img: &Rgb32FImage) -> f64 {
        let n = (img.width() * img.height()) as usize;
        if n == 0 {
            return 0.0;
        }

        let mut lum    = Vec::with_capacity(n);
        let mut chroma = Vec::with_capacity(n);
        let mut sat_sum   = 0.0f64;
        let mut sat_count = 0usize;

        for px in img.pixels() {
            let [l, a, b] = rgb_to_lab(px.0);
            let c = ((a as f64).powi(2) + (b as f64).powi(2)).sqrt();
            if l > 0.0 {
                sat_sum += c / l as f64;
                sat_count += 1;
            }
            lum.push(l as f64);
            chroma.push(c);
        }

        let mean_c  = chroma.iter().sum::<f64>() / n as f64;
        let sigma_c = (chroma.iter().map(|c| (c - mean_c).powi(2)).sum::<f64>() / n as f64).sqrt();

        lum.sort_by(|a, b| a.total_cmp(b));
        let top = ((0.01 * n as f64).round() as usize).max(1);
        let low  = lum[..top].iter().sum::<f64>() / top as f64;
        let high = lum[n - top..].iter().sum::<f64>() / top as f64;
        let con_l = high - low;

        let mu_s = if sat_count > 0 { sat_sum / sat_count as f64 } else { 0.0 };

        C_CHROMA * sigma_c + C_CONTRAST * con_l + C_SATURATION * mu_s
    }
}
