// ============================================================
// UIQM — Underwater Image Quality Measure
// ============================================================
// No-reference metric (Panetta et al., 2016) combining
//
//   UICM   — colourfulness, from α-trimmed statistics of the
//            opponent channels RG = R − G and YB = (R + G)/2 − B
//   UISM   — sharpness, EME of Sobel edge maps weighted by each
//            colour channel
//   UIConM — contrast, PLIP logAMEE over image blocks
//
//   UIQM = 0.0282·UICM + 0.2953·UISM + 3.5753·UIConM
//
// Pixel values are taken on the 0–255 scale.

use image::Rgb32FImage;

use crate::quality::NoReferenceMetric;

const C_UICM:   f64 = 0.0282;
const C_UISM:   f64 = 0.2953;
const C_UICONM: f64 = 3.5753;

/// Side of the square blocks used by EME / logAMEE
const BLOCK: usize = 10;

const TRIM_LEFT:  f64 = 0.1;
const TRIM_RIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct Uiqm;

impl NoReferenceMetric for Uiqm {
    fn score(&self, img: &Rgb32FImage) -> f64 {
        let planes = Planes::from_image(img);
        if planes.len() == 0 {
            return 0.0;
        }
        C_UICM * uicm(&planes) + C_UISM * uism(&planes) + C_UICONM * uiconm(&planes)
    }
}

/// Channel planes on the 0–255 scale, row-major.
struct Planes {
    width:  usize,
    height: usize,
    rgb:    [Vec<f64>; 3],
}

impl Planes {
    fn from_image(img: &Rgb32FImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let mut rgb = [Vec::with_capacity(w * h), Vec::with_capacity(w * h), Vec::with_capacity(w * h)];
        for px in img.pixels() {
            for c in 0..3 {
                rgb[c].push(px[c].clamp(0.0, 1.0) as f64 * 255.0);
            }
        }
        Self { width: w, height: h, rgb }
    }

    fn len(&self) -> usize { self.width * self.height }
}

// ─── UICM ─────────────────────────────────────────────────────────────────────

/// Mean after dropping the lowest `TRIM_LEFT` and highest `TRIM_RIGHT` fractions.
fn trimmed_mean(values: &mut [f64]) -> f64 {
    let k = values.len();
    values.sort_by(|a, b| a.total_cmp(b));
    let t_left  = (TRIM_LEFT * k as f64).ceil() as usize;
    let t_right = (TRIM_RIGHT * k as f64).floor() as usize;
    let kept = k.saturating_sub(t_left + t_right);
    if kept == 0 {
        return 0.0;
    }
    values[t_left..k - t_right].iter().sum::<f64>() / kept as f64
}

fn variance_about(values: &[f64], mu: f64) -> f64 {
    values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64
}

fn uicm(p: &Planes) -> f64 {
    let [r, g, b] = &p.rgb;
    let mut rg: Vec<f64> = r.iter().zip(g).map(|(r, g)| r - g).collect();
    let mut yb: Vec<f64> = r.iter().zip(g).zip(b).map(|((r, g), b)| (r + g) / 2.0 - b).collect();

    let mu_rg = trimmed_mean(&mut rg);
    let mu_yb = trimmed_mean(&mut yb);
    let s_rg  = variance_about(&rg, mu_rg);
    let s_yb  = variance_about(&yb, mu_yb);

    -0.0268 * (mu_rg.powi(2) + mu_yb.powi(2)).sqrt() + 0.1586 * (s_rg + s_yb).sqrt()
}

// ─── UISM ─────────────────────────────────────────────────────────────────────

/// Sobel gradient magnitude, rescaled so the strongest edge is 255.
/// Borders use reflected neighbours.
fn sobel(plane: &[f64], w: usize, h: usize) -> Vec<f64> {
    let at = |x: isize, y: isize| -> f64 {
        let xi = reflect(x, w);
        let yi = reflect(y, h);
        plane[yi * w + xi]
    };

    let mut mag = vec![0.0f64; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                   - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                   - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            mag[y as usize * w + x as usize] = gx.hypot(gy);
        }
    }

    let max = mag.iter().cloned().fold(0.0f64, f64::max);
    if max > 0.0 {
        mag.iter_mut().for_each(|m| *m *= 255.0 / max);
    }
    mag
}

fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let r = if i < 0 { -i - 1 } else if i >= n { 2 * n - i - 1 } else { i };
    r.clamp(0, n - 1) as usize
}

/// Per-block (max, min) over full `BLOCK`×`BLOCK` tiles; partial tiles are dropped.
fn block_extrema(planes: &[&[f64]], w: usize, h: usize) -> Vec<(f64, f64)> {
    let (k1, k2) = (w / BLOCK, h / BLOCK);
    let mut out = Vec::with_capacity(k1 * k2);
    for by in 0..k2 {
        for bx in 0..k1 {
            let mut max = f64::MIN;
            let mut min = f64::MAX;
            for plane in planes {
                for y in by * BLOCK..(by + 1) * BLOCK {
                    for v in &plane[y * w + bx * BLOCK..y * w + (bx + 1) * BLOCK] {
                        max = max.max(*v);
                        min = min.min(*v);
                    }
                }
            }
            out.push((max, min));
        }
    }
    out
}

/// Measure of enhancement: 2/(k1·k2) · Σ ln(max/min).
fn eme(plane: &[f64], w: usize, h: usize) -> f64 {
    let blocks = block_extrema(&[plane], w, h);
    if blocks.is_empty() {
        return 0.0;
    }
    let sum: f64 = blocks
        .iter()
        .filter(|(max, min)| *max != 0.0 && *min != 0.0)
        .map(|(max, min)| (max / min).ln())
        .sum();
    2.0 / blocks.len() as f64 * sum
}

fn uism(p: &Planes) -> f64 {
    const WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];
    (0..3)
        .map(|c| {
            let plane = &p.rgb[c];
            let edges = sobel(plane, p.width, p.height);
            let edge_map: Vec<f64> = edges.iter().zip(plane).map(|(e, v)| e * v).collect();
            WEIGHTS[c] * eme(&edge_map, p.width, p.height)
        })
        .sum()
}

// ─── UIConM ───────────────────────────────────────────────────────────────────

/// PLIP logAMEE across all three channels of each block.
fn uiconm(p: &Planes) -> f64 {
    let planes: Vec<&[f64]> = p.rgb.iter().map(|v| v.as_slice()).collect();
    let blocks = block_extrema(&planes, p.width, p.height);
    if blocks.is_empty() {
        return 0.0;
    }
    let sum: f64 = blocks
        .iter()
        .map(|(max, min)| {
            let top = max - min;
            let bot = max + min;
            if top == 0.0 || bot == 0.0 || top.is_nan() || bot.is_nan() {
                0.0
            } else {
                let ratio = top / bot;
                ratio * ratio.ln()
            }
        })
        .sum();
    -sum / blocks.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_uniform_gray_scores_zero() {
        let img = Rgb32FImage::from_pixel(20, 20, Rgb([0.4, 0.4, 0.4]));
        assert!(Uiqm.score(&img).abs() < 1e-9);
    }

    #[test]
    fn test_trimmed_mean_drops_tails() {
        let mut v: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        v[9] = 1000.0;
        // ceil(1.0) = 1 dropped on the left, floor(1.0) = 1 on the right
        assert!((trimmed_mean(&mut v) - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_small_image_block_terms_are_zero() {
        let img = Rgb32FImage::from_fn(6, 6, |x, _| Rgb([x as f32 / 6.0, 0.2, 0.8]));
        let p = Planes::from_image(&img);
        assert_eq!(uism(&p), 0.0);
        assert_eq!(uiconm(&p), 0.0);
        assert!(Uiqm.score(&img).is_finite());
    }

    #[test]
    fn test_textured_image_beats_flat() {
        let flat = Rgb32FImage::from_pixel(40, 40, Rgb([0.1, 0.5, 0.6]));
        let textured = Rgb32FImage::from_fn(40, 40, |x, y| {
            let v = ((x / 4 + y / 4) % 2) as f32;
            Rgb([0.2 + 0.6 * v, 0.3 + 0.4 * (1.0 - v), 0.5])
        });
        assert!(Uiqm.score(&textured) > Uiqm.score(&flat));
    }

    #[test]
    fn test_reflect_indices() {
        assert_eq!(reflect(-1, 5), 0);
        assert_eq!(reflect(5, 5), 4);
        assert_eq!(reflect(2, 5), 2);
    }
}
