//! Full VGG network: convolutional backbone, adaptive pooling and the classifier head.

use super::{VggClassifier, VggClassifierConfig, VggFeatures, VggFeaturesConfig};
use crate::architecture::{Architecture, DescriptorError, VggVariant};
use crate::init::InitWeights;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct Vgg<B: Backend> {
    pub features: VggFeatures<B>,
    /// If missing, the feature map must already have the size expected by the classifier.
    pub avgpool: Option<AdaptiveAvgPool2d>,
    pub classifier: VggClassifier<B>,
}

#[derive(Config, Debug)]
pub struct VggConfig {
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = 1000)]
    pub num_classes: usize,
    #[config(default = "Architecture::default()")]
    pub architecture: Architecture,

    /// If set to false, the framework's default initializers are kept.
    #[config(default = true)]
    pub init_weights: bool,

    #[config(default = 4096)]
    pub hidden_size: usize,
    #[config(default = 0.5)]
    pub dropout: f64,

    /// Pools the feature map to `pooled_size` before flattening, so that any input
    /// large enough for the pooling steps can be used.
    ///
    /// If set to false, the input must be sized so that the feature map is exactly
    /// `pooled_size` (e.g. 224x224 or 244x244 for the named variants).
    #[config(default = true)]
    pub adaptive_pool: bool,
    #[config(default = "[7, 7]")]
    pub pooled_size: [usize; 2],
}

impl VggConfig {
    pub fn for_variant(variant: VggVariant) -> Self {
        Self::new().with_architecture(variant.into())
    }

    /// Returns the initialized model.
    ///
    /// # Panics
    /// If the configuration is invalid, see [`Self::try_init`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg<B> {
        self.try_init(device)
            .unwrap_or_else(|e| panic!("invalid VGG configuration: {e}"))
    }

    /// Checks the descriptor and every size the model is built from.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.architecture.validate()?;
        let [pooled_h, pooled_w] = self.pooled_size;
        let sizes = [
            ("in_channels", self.in_channels),
            ("num_classes", self.num_classes),
            ("hidden_size", self.hidden_size),
            ("pooled_size", pooled_h.min(pooled_w)),
        ];
        match sizes.iter().find(|(_, size)| *size == 0) {
            Some(&(field, _)) => Err(DescriptorError::ZeroSize { field }),
            None => Ok(()),
        }
    }

    /// Returns the initialized model, or the reason the configuration cannot be built.
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<Vgg<B>, DescriptorError> {
        self.validate()?;
        let out_channels = self
            .architecture
            .out_channels()
            .ok_or(DescriptorError::NoConvolution)?;
        let [pooled_h, pooled_w] = self.pooled_size;

        let features = VggFeaturesConfig::new()
            .with_in_channels(self.in_channels)
            .with_architecture(self.architecture.clone())
            .init(device);
        let avgpool = self
            .adaptive_pool
            .then(|| AdaptiveAvgPool2dConfig::new(self.pooled_size).init());
        let classifier = VggClassifierConfig::new(out_channels * pooled_h * pooled_w)
            .with_hidden_size(self.hidden_size)
            .with_num_classes(self.num_classes)
            .with_dropout(self.dropout)
            .init(device);

        let model = Vgg {
            features,
            avgpool,
            classifier,
        };
        let model = if self.init_weights {
            model.init_weights()
        } else {
            model
        };
        log::info!(
            "built {} with {} conv and {} pool layers, {} classes",
            self.architecture,
            self.architecture.conv_count(),
            self.architecture.pool_count(),
            self.num_classes,
        );
        Ok(model)
    }

    /// Checks that an input of `[height, width]` can be fed to the model.
    ///
    /// Without adaptive pooling the feature map must match `pooled_size` exactly.
    pub fn check_input_size(&self, size: [usize; 2]) -> Result<[usize; 2], DescriptorError> {
        let feature_size = self.architecture.feature_size(size)?;
        if !self.adaptive_pool && feature_size != self.pooled_size {
            return Err(DescriptorError::FeatureSizeMismatch {
                expected: self.pooled_size,
                got: feature_size,
            });
        }
        Ok(feature_size)
    }
}

impl<B: Backend> Vgg<B> {
    /// # Shapes
    ///   - Input [batch, in_channels, height, width]
    ///   - Output [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.forward_features(x);
        self.forward_head(x)
    }

    /// Pools, flattens and classifies a feature map from [`Self::forward_features`].
    ///
    /// # Shapes
    ///   - Input [batch, out_channels, feature_height, feature_width]
    ///   - Output [batch, num_classes]
    pub fn forward_head(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch, _channels, _height, _width] = x.dims();
        let x = match &self.avgpool {
            Some(avgpool) => avgpool.forward(x),
            None => x,
        };
        let [_batch, channels, height, width] = x.dims();
        let d_input = self.classifier.d_input();
        assert_eq!(
            channels * height * width,
            d_input,
            "feature map of {channels}x{height}x{width} does not fit the classifier input of {d_input}"
        );

        let x: Tensor<B, 2> = x.reshape([batch, channels * height * width]);
        let x = self.classifier.forward(x);
        debug_assert_eq!([batch, self.classifier.num_classes()], x.dims());
        x
    }

    /// Runs the convolutional backbone only.
    ///
    /// # Shapes
    ///   - Input [batch, in_channels, height, width]
    ///   - Output [batch, out_channels, height / 2^pools, width / 2^pools]
    pub fn forward_features(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, _channels, _height, _width] = x.dims();
        let x = self.features.forward(x);
        debug_assert_eq!(batch, x.dims()[0]);
        x
    }
}

impl<B: Backend> InitWeights for Vgg<B> {
    fn init_weights(self) -> Self {
        Vgg {
            features: self.features.init_weights(),
            avgpool: self.avgpool,
            classifier: self.classifier.init_weights(),
        }
    }
}
