pub mod architecture;
pub mod init;
pub mod vgg;

pub mod prelude {
    pub use crate::architecture::{
        Architecture, DescriptorError, LayerToken, VggVariant, parse_descriptor,
    };
    pub use crate::init::InitWeights;
    pub use crate::vgg::*;
}
