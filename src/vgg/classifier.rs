use crate::init::InitWeights;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Fully-connected head: two hidden layers with ReLU and dropout, then the class logits.
#[derive(Module, Debug)]
pub struct VggClassifier<B: Backend> {
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
    pub activation: Relu,
    pub dropout: Dropout,
}

#[derive(Config, Debug)]
pub struct VggClassifierConfig {
    /// Flattened size of the feature map, `channels * height * width`.
    pub d_input: usize,
    #[config(default = 4096)]
    pub hidden_size: usize,
    #[config(default = 1000)]
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl VggClassifierConfig {
    /// Returns the initialized head.
    pub fn init<B: Backend>(&self, device: &B::Device) -> VggClassifier<B> {
        assert_ne!(self.d_input, 0);
        assert_ne!(self.hidden_size, 0);
        assert_ne!(self.num_classes, 0);
        VggClassifier {
            fc1: LinearConfig::new(self.d_input, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            fc3: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

impl<B: Backend> VggClassifier<B> {
    /// # Shapes
    ///   - Input [batch, d_input]
    ///   - Output [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, d_input] = x.dims();
        let [d_input_, _hidden] = self.fc1.weight.dims();
        assert_eq!(
            d_input, d_input_,
            "the classifier expects {d_input_} input features, got {d_input}"
        );

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        let x = self.fc2.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        let x = self.fc3.forward(x);
        debug_assert_eq!([batch, self.num_classes()], x.dims());
        x
    }

    pub fn d_input(&self) -> usize {
        self.fc1.weight.dims()[0]
    }

    pub fn num_classes(&self) -> usize {
        self.fc3.weight.dims()[1]
    }
}

impl<B: Backend> InitWeights for VggClassifier<B> {
    fn init_weights(self) -> Self {
        VggClassifier {
            fc1: self.fc1.init_weights(),
            fc2: self.fc2.init_weights(),
            fc3: self.fc3.init_weights(),
            activation: self.activation,
            dropout: self.dropout,
        }
    }
}
