//! Full-reference metrics on `[N, C, H, W]` tensors.

use burn::{
    prelude::*,
    tensor::{module::conv2d, ops::ConvOptions},
};

/// Gaussian window side used by SSIM
const SSIM_WINDOW: usize = 11;
const SSIM_SIGMA:  f64 = 1.5;
const SSIM_K1:     f64 = 0.01;
const SSIM_K2:     f64 = 0.03;

/// Peak signal-to-noise ratio over the whole batch, in dB.
///
/// Identical inputs give `f64::INFINITY`.
pub fn psnr<B: Backend>(res: Tensor<B, 4>, tar: Tensor<B, 4>, data_range: f64) -> f64 {
    let mse: f64 = (res - tar).powf_scalar(2.0).mean().into_scalar().elem();
    if mse <= 0.0 {
        return f64::INFINITY;
    }
    10.0 * (data_range * data_range / mse).log10()
}

/// Normalised 2-D Gaussian, repeated once per channel: `[channels, 1, size, size]`.
fn gaussian_window<B: Backend>(channels: usize, size: usize, sigma: f64, device: &B::Device) -> Tensor<B, 4> {
    let half = (size as f64 - 1.0) / 2.0;
    let g: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = g.iter().sum();
    let g: Vec<f64> = g.iter().map(|v| v / total).collect();

    let mut kernel = Vec::with_capacity(channels * size * size);
    for _ in 0..channels {
        for gy in &g {
            for gx in &g {
                kernel.push((gy * gx) as f32);
            }
        }
    }
    Tensor::from_data(TensorData::new(kernel, [channels, 1, size, size]), device)
}

/// Structural similarity, averaged over batch, channels and valid positions.
///
/// Uses an 11×11 Gaussian window (σ = 1.5). Images smaller than the window
/// fall back to the largest odd window that fits. The result stays on the
/// autodiff graph, so `1 - ssim` is usable as a loss.
pub fn ssim<B: Backend>(res: Tensor<B, 4>, tar: Tensor<B, 4>, data_range: f64) -> Tensor<B, 1> {
    let [_, channels, h, w] = res.dims();
    let device = res.device();

    let mut size = SSIM_WINDOW.min(h).min(w);
    if size % 2 == 0 {
        size -= 1;
    }
    let window  = gaussian_window::<B>(channels, size.max(1), SSIM_SIGMA, &device);
    let options = ConvOptions::new([1, 1], [0, 0], [1, 1], channels);
    let filter  = |t: Tensor<B, 4>| conv2d(t, window.clone(), None, options.clone());

    let mu_x = filter(res.clone());
    let mu_y = filter(tar.clone());

    let mu_xx = mu_x.clone() * mu_x.clone();
    let mu_yy = mu_y.clone() * mu_y.clone();
    let mu_xy = mu_x * mu_y;

    let sigma_xx = filter(res.clone() * res.clone()) - mu_xx.clone();
    let sigma_yy = filter(tar.clone() * tar.clone()) - mu_yy.clone();
    let sigma_xy = filter(res * tar) - mu_xy.clone();

    let c1 = (SSIM_K1 * data_range).powi(2);
    let c2 = (SSIM_K2 * data_range).powi(2);

    let numerator   = (mu_xy.mul_scalar(2.0).add_scalar(c1)) * (sigma_xy.mul_scalar(2.0).add_scalar(c2));
    let denominator = (mu_xx + mu_yy).add_scalar(c1) * (sigma_xx + sigma_yy).add_scalar(c2);

    (numerator / denominator).mean()
}
