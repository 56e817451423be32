//! Architecture descriptors for the VGG family.
//!
//! A descriptor is an ordered list of [`LayerToken`]s. Each `Conv(width)` becomes a
//! 3x3 convolution with `width` output channels followed by batch normalization and a
//! ReLU, and each `MaxPool` becomes a 2x2 max pooling with stride 2.
//!
//! References:
//! - https://arxiv.org/abs/1409.1556 (Table 1, configurations A, B, D and E)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors for malformed or unknown descriptors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unknown VGG variant {0:?}, expected one of VGG11, VGG13, VGG16, VGG19")]
    UnknownVariant(String),
    #[error("unknown layer token {0:?}, expected a positive width or \"M\"")]
    UnknownToken(String),
    #[error("convolution at position {index} has a zero width")]
    ZeroWidth { index: usize },
    #[error("the descriptor is empty")]
    Empty,
    #[error("the descriptor has no convolution")]
    NoConvolution,
    #[error("input of {height}x{width} is too small for {pools} pooling steps")]
    InputTooSmall {
        height: usize,
        width: usize,
        pools: usize,
    },
    #[error("{field} must not be zero")]
    ZeroSize { field: &'static str },
    #[error("feature map of {got:?} does not match the expected {expected:?}")]
    FeatureSizeMismatch {
        expected: [usize; 2],
        got: [usize; 2],
    },
}

/// A single entry of an architecture descriptor.
///
/// Serialized the same way the descriptor tables are usually written:
/// widths as integers and pools as `"M"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TokenRepr", into = "TokenRepr")]
pub enum LayerToken {
    /// 3x3 convolution with this many output channels, plus batch norm and ReLU.
    Conv(usize),
    /// 2x2 max pooling with stride 2.
    MaxPool,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Width(usize),
    Marker(String),
}

impl From<LayerToken> for TokenRepr {
    fn from(token: LayerToken) -> Self {
        match token {
            LayerToken::Conv(width) => TokenRepr::Width(width),
            LayerToken::MaxPool => TokenRepr::Marker("M".into()),
        }
    }
}

impl TryFrom<TokenRepr> for LayerToken {
    type Error = DescriptorError;

    fn try_from(repr: TokenRepr) -> Result<Self, Self::Error> {
        match repr {
            TokenRepr::Width(0) => Err(DescriptorError::ZeroWidth { index: 0 }),
            TokenRepr::Width(width) => Ok(LayerToken::Conv(width)),
            TokenRepr::Marker(marker) => marker.parse(),
        }
    }
}

impl FromStr for LayerToken {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("m") {
            return Ok(LayerToken::MaxPool);
        }
        match s.parse::<usize>() {
            Ok(0) => Err(DescriptorError::ZeroWidth { index: 0 }),
            Ok(width) => Ok(LayerToken::Conv(width)),
            Err(_) => Err(DescriptorError::UnknownToken(s.to_string())),
        }
    }
}

impl fmt::Display for LayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerToken::Conv(width) => write!(f, "{width}"),
            LayerToken::MaxPool => write!(f, "M"),
        }
    }
}

/// Parses a descriptor such as `"64, M, 128, M"`.
///
/// Tokens may be separated by commas, whitespace or both, and the list may be
/// wrapped in brackets as printed by [`Architecture`]'s `Display`.
pub fn parse_descriptor(s: &str) -> Result<Vec<LayerToken>, DescriptorError> {
    let s = s.trim();
    let s = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(s);
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(index, t)| {
            t.parse::<LayerToken>().map_err(|e| match e {
                DescriptorError::ZeroWidth { .. } => DescriptorError::ZeroWidth { index },
                e => e,
            })
        })
        .collect()
}

use LayerToken::{Conv as C, MaxPool as M};

#[rustfmt::skip]
const VGG11: &[LayerToken] = &[
    C(64), M,
    C(128), M,
    C(256), C(256), M,
    C(512), C(512), M,
    C(512), C(512), M,
];

#[rustfmt::skip]
const VGG13: &[LayerToken] = &[
    C(64), C(64), M,
    C(128), C(128), M,
    C(256), C(256), M,
    C(512), C(512), M,
    C(512), C(512), M,
];

#[rustfmt::skip]
const VGG16: &[LayerToken] = &[
    C(64), C(64), M,
    C(128), C(128), M,
    C(256), C(256), C(256), M,
    C(512), C(512), C(512), M,
    C(512), C(512), C(512), M,
];

#[rustfmt::skip]
const VGG19: &[LayerToken] = &[
    C(64), C(64), M,
    C(128), C(128), M,
    C(256), C(256), C(256), C(256), M,
    C(512), C(512), C(512), C(512), M,
    C(512), C(512), C(512), C(512), M,
];

/// The published VGG variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VggVariant {
    Vgg11,
    Vgg13,
    #[default]
    Vgg16,
    Vgg19,
}

impl VggVariant {
    pub const ALL: [VggVariant; 4] = [
        VggVariant::Vgg11,
        VggVariant::Vgg13,
        VggVariant::Vgg16,
        VggVariant::Vgg19,
    ];

    pub fn descriptor(&self) -> &'static [LayerToken] {
        match self {
            VggVariant::Vgg11 => VGG11,
            VggVariant::Vgg13 => VGG13,
            VggVariant::Vgg16 => VGG16,
            VggVariant::Vgg19 => VGG19,
        }
    }

    /// Number of weight layers (convolutions plus the three linear layers).
    pub fn depth(&self) -> usize {
        match self {
            VggVariant::Vgg11 => 11,
            VggVariant::Vgg13 => 13,
            VggVariant::Vgg16 => 16,
            VggVariant::Vgg19 => 19,
        }
    }
}

impl fmt::Display for VggVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VGG{}", self.depth())
    }
}

impl FromStr for VggVariant {
    type Err = DescriptorError;

    /// Accepts `VGG16`, `vgg16` or `16`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("vgg") => &trimmed[3..],
            _ => trimmed,
        };
        match digits {
            "11" => Ok(VggVariant::Vgg11),
            "13" => Ok(VggVariant::Vgg13),
            "16" => Ok(VggVariant::Vgg16),
            "19" => Ok(VggVariant::Vgg19),
            _ => Err(DescriptorError::UnknownVariant(s.to_string())),
        }
    }
}

/// Either a named variant or a custom descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    Variant(VggVariant),
    Custom(Vec<LayerToken>),
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::Variant(VggVariant::default())
    }
}

impl From<VggVariant> for Architecture {
    fn from(variant: VggVariant) -> Self {
        Architecture::Variant(variant)
    }
}

impl FromStr for Architecture {
    type Err = DescriptorError;

    /// Accepts a variant name (`VGG16`, `vgg16`) or a descriptor list (`64, M, 128, M`).
    ///
    /// A bare number is a single convolution, not a variant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let is_named = s
            .trim()
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("vgg"));
        if is_named {
            return s.parse().map(Architecture::Variant);
        }
        let tokens = parse_descriptor(s)?;
        let architecture = Architecture::Custom(tokens);
        architecture.validate()?;
        Ok(architecture)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Variant(variant) => write!(f, "{variant}"),
            Architecture::Custom(tokens) => {
                write!(f, "[")?;
                for (i, token) in tokens.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{token}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Architecture {
    pub fn tokens(&self) -> &[LayerToken] {
        match self {
            Architecture::Variant(variant) => variant.descriptor(),
            Architecture::Custom(tokens) => tokens,
        }
    }

    /// Checks that the descriptor can be built.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let tokens = self.tokens();
        if tokens.is_empty() {
            return Err(DescriptorError::Empty);
        }
        if let Some(index) = tokens.iter().position(|t| *t == LayerToken::Conv(0)) {
            return Err(DescriptorError::ZeroWidth { index });
        }
        if self.conv_count() == 0 {
            return Err(DescriptorError::NoConvolution);
        }
        Ok(())
    }

    pub fn conv_count(&self) -> usize {
        self.tokens()
            .iter()
            .filter(|t| matches!(t, LayerToken::Conv(_)))
            .count()
    }

    pub fn pool_count(&self) -> usize {
        self.tokens()
            .iter()
            .filter(|t| matches!(t, LayerToken::MaxPool))
            .count()
    }

    /// Channel count leaving the feature stack, or `None` if there is no convolution.
    pub fn out_channels(&self) -> Option<usize> {
        self.tokens().iter().rev().find_map(|t| match t {
            LayerToken::Conv(width) => Some(*width),
            LayerToken::MaxPool => None,
        })
    }

    /// Spatial size `[height, width]` after the feature stack.
    ///
    /// Convolutions keep the size (3x3, padding 1), each pool halves it rounding down.
    pub fn feature_size(&self, [height, width]: [usize; 2]) -> Result<[usize; 2], DescriptorError> {
        let pools = self.pool_count();
        let (mut h, mut w) = (height, width);
        for _ in 0..pools {
            h /= 2;
            w /= 2;
            if h == 0 || w == 0 {
                return Err(DescriptorError::InputTooSmall {
                    height,
                    width,
                    pools,
                });
            }
        }
        Ok([h, w])
    }
}
