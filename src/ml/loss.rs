// ============================================================
// Layer 5 — Composite Restoration Loss
// ============================================================
//   loss = w_l1    · SmoothL1(res, tar)
//        + w_ssim  · (1 − SSIM(res, tar))
//        + w_lpips · LPIPS(res, tar)
//
// SmoothL1 is Burn's Huber loss with δ = 1. The LPIPS term is
// only present when pretrained LPIPS weights were supplied.

use anyhow::Result;
use burn::{
    nn::loss::{HuberLoss, HuberLossConfig, Reduction},
    prelude::*,
};

use crate::quality::{lpips::Lpips, reference::ssim};

pub struct EnhanceLoss<B: Backend> {
    huber:    HuberLoss,
    lpips:    Option<Lpips<B>>,
    w_l1:     f64,
    w_ssim:   f64,
    w_lpips:  f64,
}

/// Individual terms, detached, for logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossTerms {
    pub smooth_l1: f64,
    pub ssim:      f64,
    pub lpips:     Option<f64>,
}

impl<B: Backend> EnhanceLoss<B> {
    pub fn new(lpips: Option<Lpips<B>>, w_l1: f64, w_ssim: f64, w_lpips: f64) -> Self {
        Self {
            huber: HuberLossConfig::new(1.0).init(),
            lpips,
            w_l1,
            w_ssim,
            w_lpips,
        }
    }

    pub fn has_lpips(&self) -> bool {
        self.lpips.is_some()
    }

    /// Weighted total (still on the autodiff graph) and its parts.
    pub fn forward(&self, res: Tensor<B, 4>, tar: Tensor<B, 4>) -> Result<(Tensor<B, 1>, LossTerms)> {
        let l1 = self.huber.forward(res.clone(), tar.clone(), Reduction::Mean);
        let ssim_loss = ssim(res.clone(), tar.clone(), 1.0).neg().add_scalar(1.0);

        let mut terms = LossTerms {
            smooth_l1: l1.clone().into_scalar().elem(),
            ssim:      ssim_loss.clone().into_scalar().elem(),
            lpips:     None,
        };

        let mut total = l1.mul_scalar(self.w_l1) + ssim_loss.mul_scalar(self.w_ssim);

        if let Some(lpips) = &self.lpips {
            let lp = lpips.distance(res, tar)?;
            terms.lpips = Some(lp.clone().into_scalar().elem());
            total = total + lp.mul_scalar(self.w_lpips);
        }

        Ok((total, terms))
    }
}
