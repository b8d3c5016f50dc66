// ============================================================
// LPIPS — Learned Perceptual Image Patch Similarity
// ============================================================
// Distance between deep features of two images (Zhang et al.,
// 2018) using the AlexNet backbone:
//
//   1. Map [0, 1] input to [-1, 1], then apply the fixed
//      per-channel shift/scale the backbone was trained with
//   2. Extract the five ReLU activations of AlexNet's conv stack
//   3. Unit-normalise each activation across channels
//   4. Squared difference → learned 1×1 head → spatial mean
//   5. Sum over the five layers
//
// The network is only meaningful with pretrained weights. They
// are loaded from a Burn record file; nothing is downloaded.

use anyhow::{Context, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::activation::relu,
};
use std::path::Path;

const SHIFT: [f32; 3] = [-0.030, -0.088, -0.188];
const SCALE: [f32; 3] = [0.458, 0.448, 0.450];

/// Channel widths of the five tapped AlexNet layers
const TAP_CHANNELS: [usize; 5] = [64, 192, 384, 256, 256];

/// Smallest height/width that survives conv1 (k11 s4 p2) and both 3×3/2 pools
pub const LPIPS_MIN_SIDE: usize = 31;

#[derive(Config, Debug)]
pub struct LpipsConfig {
    /// Added under the square root when unit-normalising features
    #[config(default = 1e-10)]
    pub eps: f64,
}

impl LpipsConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Lpips<B> {
        let conv = |i: usize, o: usize, k: usize, s: usize, p: usize| {
            Conv2dConfig::new([i, o], [k, k])
                .with_stride([s, s])
                .with_padding(PaddingConfig2d::Explicit(p, p))
                .init(device)
        };
        let heads = TAP_CHANNELS
            .iter()
            .map(|&c| Conv2dConfig::new([c, 1], [1, 1]).with_bias(false).init(device))
            .collect();

        Lpips {
            conv1: conv(3, 64, 11, 4, 2),
            conv2: conv(64, 192, 5, 1, 2),
            conv3: conv(192, 384, 3, 1, 1),
            conv4: conv(384, 256, 3, 1, 1),
            conv5: conv(256, 256, 3, 1, 1),
            pool:  MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init(),
            heads,
            eps:   self.eps,
        }
    }
}

#[derive(Module, Debug)]
pub struct Lpips<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub conv4: Conv2d<B>,
    pub conv5: Conv2d<B>,
    pub pool:  MaxPool2d,
    pub heads: Vec<Conv2d<B>>,
    pub eps:   f64,
}

impl<B: Backend> Lpips<B> {
    /// Build the network and load pretrained weights. Parameters are frozen.
    pub fn load(path: &Path, device: &B::Device) -> Result<Self> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .with_context(|| format!("Cannot load LPIPS weights from '{}'", path.display()))?;
        tracing::info!("Loaded LPIPS weights from '{}'", path.display());
        Ok(LpipsConfig::new().init(device).load_record(record).no_grad())
    }

    fn scale_input(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = x.device();
        let shift = Tensor::<B, 1>::from_floats(SHIFT, &device).reshape([1, 3, 1, 1]);
        let scale = Tensor::<B, 1>::from_floats(SCALE, &device).reshape([1, 3, 1, 1]);
        (x.mul_scalar(2.0).sub_scalar(1.0) - shift) / scale
    }

    /// The five ReLU taps.
    fn features(&self, x: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let r1 = relu(self.conv1.forward(x));
        let r2 = relu(self.conv2.forward(self.pool.forward(r1.clone())));
        let r3 = relu(self.conv3.forward(self.pool.forward(r2.clone())));
        let r4 = relu(self.conv4.forward(r3.clone()));
        let r5 = relu(self.conv5.forward(r4.clone()));
        vec![r1, r2, r3, r4, r5]
    }

    /// Per-sample distance, shape `[batch]`. Inputs are `[N, 3, H, W]` in [0, 1]
    /// with H, W ≥ `LPIPS_MIN_SIDE`.
    fn per_sample(&self, res: Tensor<B, 4>, tar: Tensor<B, 4>) -> Tensor<B, 1> {
        let batch = res.dims()[0];
        let fx = self.features(self.scale_input(res));
        let fy = self.features(self.scale_input(tar));

        let layers: Vec<Tensor<B, 1>> = fx
            .into_iter()
            .zip(fy)
            .zip(&self.heads)
            .map(|((a, b), head)| {
                let diff = (unit_normalise(a, self.eps) - unit_normalise(b, self.eps)).powf_scalar(2.0);
                head.forward(diff).mean_dim(3).mean_dim(2).reshape([batch])
            })
            .collect();

        Tensor::stack::<2>(layers, 0).sum_dim(0).reshape([batch])
    }

    /// Batch-mean distance as a scalar tensor.
    ///
    /// Errors when the images are too small for the backbone.
    pub fn distance(&self, res: Tensor<B, 4>, tar: Tensor<B, 4>) -> Result<Tensor<B, 1>> {
        let [_, _, h, w] = res.dims();
        anyhow::ensure!(
            h >= LPIPS_MIN_SIDE && w >= LPIPS_MIN_SIDE,
            "LPIPS needs images of at least {LPIPS_MIN_SIDE}x{LPIPS_MIN_SIDE} pixels, got {w}x{h}"
        );
        Ok(self.per_sample(res, tar).mean())
    }
}

/// Divide each spatial feature vector by its L2 norm across channels.
fn unit_normalise<B: Backend>(t: Tensor<B, 4>, eps: f64) -> Tensor<B, 4> {
    let norm = t.clone().powf_scalar(2.0).sum_dim(1).add_scalar(eps).sqrt();
    t / norm
}
