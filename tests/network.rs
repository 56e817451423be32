use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;
use burn::tensor::Distribution;
use burn_vgg::architecture::LayerToken::{Conv, MaxPool};
use burn_vgg::prelude::*;

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

/// A VGG-shaped network small enough for the CPU.
fn tiny_config() -> VggConfig {
    VggConfig::new()
        .with_in_channels(3)
        .with_num_classes(5)
        .with_hidden_size(32)
        .with_pooled_size([2, 2])
        .with_architecture(Architecture::Custom(vec![
            Conv(8),
            MaxPool,
            Conv(16),
            Conv(16),
            MaxPool,
        ]))
}

fn random_input<B: Backend>(shape: [usize; 4], device: &B::Device) -> Tensor<B, 4> {
    Tensor::random(shape, Distribution::Normal(0., 1.), device)
}

#[test]
fn default_config_is_vgg16_for_imagenet() {
    let config = VggConfig::new();
    assert_eq!(config.in_channels, 3);
    assert_eq!(config.num_classes, 1000);
    assert_eq!(config.architecture, Architecture::Variant(VggVariant::Vgg16));
    assert!(config.init_weights);
    assert_eq!(config.hidden_size, 4096);
    assert_eq!(config.dropout, 0.5);
    assert!(config.adaptive_pool);
    assert_eq!(config.pooled_size, [7, 7]);

    let config = VggConfig::for_variant(VggVariant::Vgg11);
    assert_eq!(config.architecture, Architecture::Variant(VggVariant::Vgg11));
}

#[test]
fn builder_threads_channels_through_the_stack() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().with_in_channels(1).init(&device);

    let layers = &model.features.layers;
    assert_eq!(layers.len(), 5);
    let convs: Vec<[usize; 4]> = layers
        .iter()
        .filter_map(|layer| match layer {
            FeatureLayer::Conv(block) => Some(block.conv.weight.dims()),
            FeatureLayer::Pool(_) => None,
        })
        .collect();
    assert_eq!(convs, vec![[8, 1, 3, 3], [16, 8, 3, 3], [16, 16, 3, 3]]);
    assert!(matches!(layers[1], FeatureLayer::Pool(_)));
    assert!(matches!(layers[4], FeatureLayer::Pool(_)));

    for layer in layers {
        if let FeatureLayer::Conv(block) = layer {
            let [channels_out, ..] = block.conv.weight.dims();
            assert_eq!(block.norm.gamma.dims(), [channels_out]);
            assert!(block.conv.bias.is_some());
        }
    }

    assert_eq!(model.features.out_channels(), 16);
    assert_eq!(model.classifier.d_input(), 16 * 2 * 2);
    assert_eq!(model.classifier.num_classes(), 5);
    assert_eq!(model.classifier.fc2.weight.dims(), [32, 32]);
}

#[test]
fn forward_shapes() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().init(&device);

    let x = random_input::<TestBackend>([2, 3, 16, 16], &device);
    let features = model.forward_features(x.clone());
    assert_eq!(features.dims(), [2, 16, 4, 4]);

    let y = model.forward(x);
    assert_eq!(y.dims(), [2, 5]);
}

#[test]
fn forward_head_reuses_the_feature_map() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().with_dropout(0.0).init(&device);

    let x = random_input::<TestBackend>([2, 3, 16, 16], &device);
    let features = model.forward_features(x.clone());
    let y = model.forward_head(features);
    assert_eq!(y.dims(), [2, 5]);

    let expected = model.forward(x);
    y.into_data().assert_approx_eq::<f32>(&expected.into_data(), Default::default());
}

#[test]
fn adaptive_pool_accepts_other_input_sizes() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().init(&device);

    for [height, width] in [[8, 8], [20, 12], [33, 17]] {
        let x = random_input::<TestBackend>([1, 3, height, width], &device);
        assert_eq!(model.forward(x).dims(), [1, 5], "{height}x{width}");
    }
}

#[test]
fn fixed_pool_uses_the_feature_map_directly() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().with_adaptive_pool(false).init(&device);
    assert!(model.avgpool.is_none());

    // 8x8 -> 4x4 -> 2x2, the expected pooled size
    let x = random_input::<TestBackend>([3, 3, 8, 8], &device);
    assert_eq!(model.forward(x).dims(), [3, 5]);
}

#[test]
#[should_panic(expected = "does not fit the classifier input")]
fn fixed_pool_rejects_mismatched_inputs() {
    let device = Default::default();
    let model: Vgg<TestBackend> = tiny_config().with_adaptive_pool(false).init(&device);

    let x = random_input::<TestBackend>([1, 3, 16, 16], &device);
    let _ = model.forward(x);
}

#[test]
fn check_input_size() {
    let config = tiny_config();
    assert_eq!(config.check_input_size([16, 16]), Ok([4, 4]));
    assert_eq!(
        config.check_input_size([3, 16]),
        Err(DescriptorError::InputTooSmall {
            height: 3,
            width: 16,
            pools: 2
        })
    );

    let config = config.with_adaptive_pool(false);
    assert_eq!(config.check_input_size([8, 9]), Ok([2, 2]));
    assert_eq!(
        config.check_input_size([16, 16]),
        Err(DescriptorError::FeatureSizeMismatch {
            expected: [2, 2],
            got: [4, 4]
        })
    );

    // 244x244 inputs line up with the 7x7 classifier input
    let config = VggConfig::new().with_adaptive_pool(false);
    assert_eq!(config.check_input_size([244, 244]), Ok([7, 7]));
    assert_eq!(config.check_input_size([224, 224]), Ok([7, 7]));
}

#[test]
fn try_init_reports_invalid_descriptors() {
    let device = Default::default();
    let config = tiny_config().with_architecture(Architecture::Custom(vec![]));
    let result = config.try_init::<TestBackend>(&device);
    assert!(matches!(result, Err(DescriptorError::Empty)));

    let config = tiny_config().with_architecture(Architecture::Custom(vec![MaxPool, MaxPool]));
    let result = config.try_init::<TestBackend>(&device);
    assert!(matches!(result, Err(DescriptorError::NoConvolution)));
}

#[test]
fn try_init_reports_zero_sizes() {
    let device = Default::default();
    let cases = [
        ("in_channels", tiny_config().with_in_channels(0)),
        ("num_classes", tiny_config().with_num_classes(0)),
        ("hidden_size", tiny_config().with_hidden_size(0)),
        ("pooled_size", tiny_config().with_pooled_size([0, 7])),
        ("pooled_size", tiny_config().with_pooled_size([7, 0])),
    ];
    for (field, config) in cases {
        assert_eq!(config.validate(), Err(DescriptorError::ZeroSize { field }));
        let result = config.try_init::<TestBackend>(&device);
        assert!(
            matches!(result, Err(DescriptorError::ZeroSize { field: f }) if f == field),
            "{field}"
        );
    }
}

#[test]
#[should_panic(expected = "invalid VGG configuration")]
fn init_panics_on_invalid_descriptors() {
    let device = Default::default();
    let config = tiny_config().with_architecture(Architecture::Custom(vec![Conv(0)]));
    let _model: Vgg<TestBackend> = config.init(&device);
}

#[test]
fn vgg16_feature_parameter_count() {
    let device = Default::default();
    // a narrow head keeps the classifier small
    let model: Vgg<TestBackend> = VggConfig::for_variant(VggVariant::Vgg16)
        .with_hidden_size(4)
        .with_num_classes(2)
        .with_pooled_size([1, 1])
        .with_init_weights(false)
        .init(&device);

    // conv weights and biases, plus batch norm scale, shift, running mean and running variance
    assert_eq!(model.features.num_params(), 14_714_688 + 4 * 4224);
    assert_eq!(model.features.layers.len(), 18);
    assert_eq!(model.classifier.d_input(), 512);
}

#[test]
fn config_json_keeps_the_descriptor_table_format() {
    let config = tiny_config();
    let json = config.to_string();
    assert!(json.contains("\"M\""), "{json}");

    let loaded = VggConfig::load_binary(json.as_bytes()).unwrap();
    assert_eq!(loaded.architecture, config.architecture);
    assert_eq!(loaded.pooled_size, [2, 2]);
    assert_eq!(loaded.num_classes, 5);
}

#[test]
fn gradients_reach_the_first_convolution() {
    let device = Default::default();
    let model: Vgg<TestAutodiffBackend> = tiny_config().with_dropout(0.0).init(&device);

    let x = random_input::<TestAutodiffBackend>([2, 3, 16, 16], &device);
    let loss = model.forward(x).sum();
    let grads = loss.backward();

    let FeatureLayer::Conv(first) = &model.features.layers[0] else {
        panic!("the first layer should be a convolution")
    };
    let grad = first.conv.weight.grad(&grads).expect("missing gradient");
    assert_eq!(grad.dims(), [8, 3, 3, 3]);
    let grad = model.classifier.fc3.weight.grad(&grads).expect("missing gradient");
    assert_eq!(grad.dims(), [32, 5]);
}
