// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From image files on disk to tensor batches:
//
//   <root>/input, <root>/target
//       │
//       ▼
//   PairedImageSource   → lists input/target pairs by file name
//       │
//       ▼
//   PairedImageDataset  → decodes, crops/flips (train) or resizes (test)
//       │
//       ▼
//   EnhanceBatcher      → stacks items into [N, 3, H, W] tensors
//       │
//       ▼
//   DataLoader          → feeds the trainer / evaluator

/// Scans paired image directories
pub mod loader;

/// Aligned crop / flip / resize for image pairs
pub mod augment;

/// Implements Burn's Dataset trait for image pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
