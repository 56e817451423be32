//! The convolutional backbone, built from an [`Architecture`] descriptor.

use crate::architecture::{Architecture, LayerToken};
use crate::init::InitWeights;
use burn::nn::{
    BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    conv::{Conv2d, Conv2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
};
use burn::prelude::*;

/// 3x3 convolution (stride 1, padding 1) followed by batch norm and ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    pub channels_in: usize,
    pub channels_out: usize,
}

impl ConvBlockConfig {
    /// Returns the initialized block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        assert_ne!(self.channels_in, 0);
        assert_ne!(self.channels_out, 0);
        ConvBlock {
            conv: Conv2dConfig::new([self.channels_in, self.channels_out], [3, 3])
                .with_stride([1, 1])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(true)
                .init(device),
            norm: BatchNormConfig::new(self.channels_out).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> ConvBlock<B> {
    /// # Shapes
    ///   - Input [batch, channels_in, height, width]
    ///   - Output [batch, channels_out, height, width]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, _channels_in, height, width] = x.dims();
        let [channels_out, _, _, _] = self.conv.weight.dims();

        let x = self.conv.forward(x);
        debug_assert_eq!([batch, channels_out, height, width], x.dims());
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

impl<B: Backend> InitWeights for ConvBlock<B> {
    fn init_weights(self) -> Self {
        ConvBlock {
            conv: self.conv.init_weights(),
            norm: self.norm.init_weights(),
            activation: self.activation,
        }
    }
}

/// One entry of the feature stack, mirroring a [`LayerToken`].
#[derive(Module, Debug)]
pub enum FeatureLayer<B: Backend> {
    Conv(ConvBlock<B>),
    Pool(MaxPool2d),
}

impl<B: Backend> FeatureLayer<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            FeatureLayer::Conv(block) => block.forward(x),
            FeatureLayer::Pool(pool) => pool.forward(x),
        }
    }
}

#[derive(Module, Debug)]
pub struct VggFeatures<B: Backend> {
    pub layers: Vec<FeatureLayer<B>>,
}

#[derive(Config, Debug)]
pub struct VggFeaturesConfig {
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = "Architecture::default()")]
    pub architecture: Architecture,
}

impl VggFeaturesConfig {
    /// Returns the initialized backbone.
    ///
    /// Walks the descriptor once, threading the channel count from one convolution to the next.
    pub fn init<B: Backend>(&self, device: &B::Device) -> VggFeatures<B> {
        let tokens = self.architecture.tokens();
        let mut layers = Vec::with_capacity(tokens.len());
        let mut channels_in = self.in_channels;
        for (i, token) in tokens.iter().enumerate() {
            let layer = match *token {
                LayerToken::Conv(channels_out) => {
                    log::debug!("layer {i}: conv {channels_in} -> {channels_out}");
                    let block = ConvBlockConfig::new(channels_in, channels_out).init(device);
                    channels_in = channels_out;
                    FeatureLayer::Conv(block)
                }
                LayerToken::MaxPool => {
                    log::debug!("layer {i}: max pool 2x2");
                    FeatureLayer::Pool(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
                }
            };
            layers.push(layer);
        }
        VggFeatures { layers }
    }
}

impl<B: Backend> VggFeatures<B> {
    /// # Shapes
    ///   - Input [batch, in_channels, height, width]
    ///   - Output [batch, out_channels, height / 2^pools, width / 2^pools]
    pub fn forward(&self, mut x: Tensor<B, 4>) -> Tensor<B, 4> {
        for layer in self.layers.iter() {
            x = layer.forward(x);
        }
        x
    }

    /// Channel count of the last convolution.
    pub fn out_channels(&self) -> usize {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| match layer {
                FeatureLayer::Conv(block) => Some(block.conv.weight.dims()[0]),
                FeatureLayer::Pool(_) => None,
            })
            .unwrap_or(0)
    }
}

impl<B: Backend> InitWeights for VggFeatures<B> {
    fn init_weights(self) -> Self {
        let layers = self
            .layers
            .into_iter()
            .map(|layer| match layer {
                FeatureLayer::Conv(block) => FeatureLayer::Conv(block.init_weights()),
                pool => pool,
            })
            .collect();
        VggFeatures { layers }
    }
}
