// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete directory scanner, so a different source (a list
// file, an archive) can slot in without touching the use cases.

use anyhow::Result;
use crate::domain::sample::ImagePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Anything that can enumerate input/target image pairs.
///
/// Implementations:
///   - PairedImageSource → two sibling directories matched by file name
pub trait PairSource {
    /// Return every pair, in a stable order.
    fn pairs(&self) -> Result<Vec<ImagePair>>;
}
