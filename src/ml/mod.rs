// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// Everything that builds, trains, or runs the network:
//
//   model.rs     — EnhanceNet, a two-scale residual U-Net
//   loss.rs      — SmoothL1 + SSIM + LPIPS composite loss
//   meter.rs     — running averages of the quality metrics
//   trainer.rs   — train loop, cosine LR, validation, checkpoints
//   evaluator.rs — test-set restoration and scoring
//
// Every function is generic over the Burn backend; the
// application layer picks Wgpu or NdArray.

pub mod model;
pub mod loss;
pub mod meter;
pub mod trainer;
pub mod evaluator;
