//! sRGB → CIE L*a*b* conversion (D65 white point).

/// D65 reference white
const WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

fn srgb_to_linear(c: f32) -> f32 {
    if c > 0.040_45 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn lab_f(t: f32) -> f32 {
    if t > 0.008_856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Convert one sRGB pixel in [0, 1] to (L, a, b), with L in [0, 100].
pub fn rgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(c.clamp(0.0, 1.0)));

    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let fx = lab_f(x / WHITE[0]);
    let fy = lab_f(y / WHITE[1]);
    let fz = lab_f(z / WHITE[2]);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_and_black() {
        let [l, a, b] = rgb_to_lab([1.0, 1.0, 1.0]);
        assert!((l - 100.0).abs() < 0.1, "L was {l}");
        assert!(a.abs() < 0.1 && b.abs() < 0.1);

        let [l, _, _] = rgb_to_lab([0.0, 0.0, 0.0]);
        assert!(l.abs() < 1e-3);
    }

    #[test]
    fn test_red_has_positive_a() {
        let [_, a, b] = rgb_to_lab([1.0, 0.0, 0.0]);
        assert!(a > 70.0 && b > 50.0);
    }
}
