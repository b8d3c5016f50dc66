// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns shared by the training and evaluation paths:
//
//   config.rs     — YAML/TOML/JSON run configuration
//   checkpoint.rs — CompactRecorder weights, best.json,
//                   model_config.json
//   metrics.rs    — JSON-lines metric records
//   image_io.rs   — tensor ⇄ image conversion and saving

pub mod config;
pub mod checkpoint;
pub mod metrics;
pub mod image_io;
