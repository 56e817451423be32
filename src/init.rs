//! Weight initialization, dispatched on layer type.
//!
//! - [`Conv2d`]: Kaiming normal in fan-out mode with the ReLU gain, zero bias.
//! - [`BatchNorm`]: unit scale, zero shift.
//! - [`Linear`]: normal with mean 0 and std 0.01, zero bias.

use burn::nn::{BatchNorm, Initializer, Linear, conv::Conv2d};
use burn::prelude::*;

/// Standard deviation of the linear weights.
pub const LINEAR_STD: f64 = 0.01;

/// Kaiming gain for a ReLU nonlinearity.
pub const RELU_GAIN: f64 = std::f64::consts::SQRT_2;

/// Re-initializes the parameters of a layer, keeping their ids.
pub trait InitWeights {
    fn init_weights(self) -> Self;
}

impl<B: Backend> InitWeights for Conv2d<B> {
    fn init_weights(mut self) -> Self {
        let [channels_out, _channels_in, k0, k1] = self.weight.dims();
        let fan_out = channels_out * k0 * k1;
        let initializer = Initializer::KaimingNormal {
            gain: RELU_GAIN,
            fan_out_only: true,
        };
        self.weight = self.weight.map(|w| {
            let t = initializer
                .init_with::<B, 4, _>(w.dims(), None, Some(fan_out), &w.device())
                .val();
            replace(w, t)
        });
        self.bias = self.bias.map(|bias| bias.map(zeros));
        self
    }
}

impl<B: Backend> InitWeights for BatchNorm<B, 2> {
    fn init_weights(mut self) -> Self {
        self.gamma = self.gamma.map(|g| {
            let ones = g.ones_like();
            replace(g, ones)
        });
        self.beta = self.beta.map(zeros);
        self
    }
}

impl<B: Backend> InitWeights for Linear<B> {
    fn init_weights(mut self) -> Self {
        let initializer = Initializer::Normal {
            mean: 0.0,
            std: LINEAR_STD,
        };
        self.weight = self.weight.map(|w| {
            let t = initializer.init::<B, 2, _>(w.dims(), &w.device()).val();
            replace(w, t)
        });
        self.bias = self.bias.map(|bias| bias.map(zeros));
        self
    }
}

/// Swaps the values of `old`, keeping whether it tracks gradients.
fn replace<B: Backend, const D: usize>(old: Tensor<B, D>, new: Tensor<B, D>) -> Tensor<B, D> {
    debug_assert_eq!(old.dims(), new.dims());
    let require_grad = old.is_require_grad();
    new.detach().set_require_grad(require_grad)
}

fn zeros<B: Backend, const D: usize>(t: Tensor<B, D>) -> Tensor<B, D> {
    let z = t.zeros_like();
    replace(t, z)
}
