// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each:
//
//   train_use_case.rs — scan data, build datasets, train
//   test_use_case.rs  — scan data, load a checkpoint, evaluate
//
// No ML math and no argument parsing here. The use cases also
// own the choice of Burn backend, so everything below them
// stays generic.

pub mod train_use_case;
pub mod test_use_case;

/// Which Burn backend runs the tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// GPU through wgpu (Vulkan / Metal / DX12)
    #[default]
    Wgpu,
    /// Pure-Rust CPU backend
    NdArray,
}
