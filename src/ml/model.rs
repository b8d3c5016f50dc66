use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::{
        activation::relu,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct EnhanceNetConfig {
    /// Channels at full resolution; the bottleneck uses twice this
    #[config(default = 16)]
    pub base_channels: usize,
    /// Residual blocks at half resolution
    #[config(default = 4)]
    pub num_blocks:    usize,
}

fn conv3x3<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [3, 3])
        .with_padding(PaddingConfig2d::Same)
        .init(device)
}

impl EnhanceNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EnhanceNet<B> {
        let c = self.base_channels;
        let down = Conv2dConfig::new([c, 2 * c], [3, 3])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let blocks = (0..self.num_blocks)
            .map(|_| ResidualBlock {
                conv1: conv3x3([2 * c, 2 * c], device),
                conv2: conv3x3([2 * c, 2 * c], device),
            })
            .collect();

        EnhanceNet {
            head: conv3x3([3, c], device),
            down,
            blocks,
            fuse: conv3x3([3 * c, c], device),
            tail: conv3x3([c, 3], device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let y = self.conv2.forward(relu(self.conv1.forward(x.clone())));
        x + y
    }
}

/// Two-scale residual U-Net that predicts a correction to the input.
///
/// head (full res) ─────────────── skip ──────────────┐
///   └─ down (stride 2) → residual blocks → upsample ─┴─ concat → fuse → tail → + input
#[derive(Module, Debug)]
pub struct EnhanceNet<B: Backend> {
    pub head:   Conv2d<B>,
    pub down:   Conv2d<B>,
    pub blocks: Vec<ResidualBlock<B>>,
    pub fuse:   Conv2d<B>,
    pub tail:   Conv2d<B>,
}

impl<B: Backend> EnhanceNet<B> {
    /// images: [batch, 3, H, W] in [0, 1] → restored, same shape, clamped to [0, 1]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = images.dims();

        let skip = relu(self.head.forward(images.clone()));

        let mut x = relu(self.down.forward(skip.clone()));
        for block in &self.blocks {
            x = block.forward(x);
        }

        // Bilinear resize back to the skip size handles odd H/W exactly.
        let x = interpolate(
            x,
            [height, width],
            InterpolateOptions::new(InterpolateMode::Bilinear),
        );

        let x = relu(self.fuse.forward(Tensor::cat(vec![skip, x], 1)));
        (images + self.tail.forward(x)).clamp(0.0, 1.0)
    }
}
