// ============================================================
// Layer 4 — Image Pair Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec of decoded pairs
// becomes two [N, 3, H, W] tensors on the target device.
//
// All items in one batch must share H and W. Training crops
// guarantee this; evaluation runs with batch size 1 so
// original-resolution images of any size are fine.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImagePairItem;

#[derive(Debug, Clone)]
pub struct EnhanceBatch<B: Backend> {
    /// Degraded images — shape: [batch, 3, height, width]
    pub inputs: Tensor<B, 4>,

    /// Reference images — same shape as `inputs`
    pub targets: Tensor<B, 4>,

    /// File names, in batch order (used to name restored outputs)
    pub names: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct EnhanceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> EnhanceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImagePairItem, EnhanceBatch<B>> for EnhanceBatcher<B> {
    fn batch(&self, items: Vec<ImagePairItem>) -> EnhanceBatch<B> {
        let batch_size = items.len();
        let (height, width) = (items[0].height, items[0].width);

        assert!(
            items.iter().all(|i| i.height == height && i.width == width),
            "all images in a batch must share one size; use batch size 1 for original-resolution data"
        );

        let mut input_flat  = Vec::with_capacity(batch_size * 3 * height * width);
        let mut target_flat = Vec::with_capacity(batch_size * 3 * height * width);
        let mut names       = Vec::with_capacity(batch_size);

        for item in items {
            input_flat.extend_from_slice(&item.input);
            target_flat.extend_from_slice(&item.target);
            names.push(item.name);
        }

        let shape = [batch_size, 3, height, width];
        let inputs  = Tensor::<B, 4>::from_data(TensorData::new(input_flat, shape), &self.device);
        let targets = Tensor::<B, 4>::from_data(TensorData::new(target_flat, shape), &self.device);

        EnhanceBatch { inputs, targets, names }
    }
}
