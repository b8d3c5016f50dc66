// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works on:
// paired underwater images, the split they belong to, and
// the patch geometry used when cropping for training.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, and traits

// An input/target image pair and related value types
pub mod sample;

// Core abstractions other layers implement
pub mod traits;
