mod classifier;
mod features;
mod network;

pub use classifier::{VggClassifier, VggClassifierConfig};
pub use features::{ConvBlock, ConvBlockConfig, FeatureLayer, VggFeatures, VggFeaturesConfig};
pub use network::{Vgg, VggConfig};
