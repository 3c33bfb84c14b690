use ndarray::{array, Array4, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::error::QNetError;
use crate::layers::{Conv2DLayer, DenseLayer, FanIn, LayerTrait, WeightInit};

fn rng() -> StdRng {
    StdRng::seed_from_u64(17)
}

#[test]
fn test_dense_layer_creation() {
    let layer = DenseLayer::new(
        3,
        2,
        Activation::leaky_rectify(),
        WeightInit::he_normal(),
        WeightInit::Constant(0.1),
        &mut rng(),
    )
    .unwrap();

    assert_eq!(layer.weights.shape(), [3, 2]);
    assert_eq!(layer.biases, array![0.1f32, 0.1]);
    assert_eq!(layer.output_size(), 2);
    assert_eq!(layer.regularizable(), vec![true, false]);
}

#[test]
fn test_dense_layer_forward() {
    let mut layer = DenseLayer::new(2, 2, Activation::leaky_rectify(), WeightInit::Constant(0.0), WeightInit::Constant(0.0), &mut rng())
        .unwrap()
        .with_weights(array![[1.0, -1.0], [2.0, 0.5]])
        .unwrap()
        .with_biases(array![0.0, -1.0])
        .unwrap();

    let inputs = array![[1.0f32, 1.0], [0.0, -1.0]];
    let outputs = layer.forward_batch(inputs.view()).unwrap();
    // pre-activations: [[3, -1.5], [-2, -1.5]]
    let expected = array![[3.0f32, -0.015], [-0.02, -0.015]];
    for (o, e) in outputs.iter().zip(expected.iter()) {
        assert!((o - e).abs() < 1e-6);
    }
    assert_eq!(layer.predict_batch(inputs.view()).unwrap(), outputs);
}

#[test]
fn test_dense_layer_rejects_misshaped_overrides() {
    let layer = || DenseLayer::new(2, 2, Activation::Linear, WeightInit::Constant(0.0), WeightInit::Constant(0.0), &mut rng()).unwrap();
    assert!(matches!(
        layer().with_weights(array![[1.0, 2.0, 3.0]]),
        Err(QNetError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        layer().with_biases(array![1.0]),
        Err(QNetError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_dense_layer_rejects_wrong_width() {
    let layer = DenseLayer::new(3, 2, Activation::Linear, WeightInit::he_normal(), WeightInit::Constant(0.0), &mut rng()).unwrap();
    let inputs = array![[1.0, 2.0]];
    assert!(matches!(
        layer.predict_batch(inputs.view()),
        Err(QNetError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_backward_before_forward_fails() {
    let layer = DenseLayer::new(2, 2, Activation::Linear, WeightInit::he_normal(), WeightInit::Constant(0.0), &mut rng()).unwrap();
    let errors = array![[1.0, 1.0]];
    assert!(matches!(
        layer.backward_batch(errors.view()),
        Err(QNetError::TrainingError(_))
    ));
}

#[test]
fn test_dense_backward_linear() {
    let mut layer = DenseLayer::new(2, 1, Activation::Linear, WeightInit::Constant(0.0), WeightInit::Constant(0.0), &mut rng())
        .unwrap()
        .with_weights(array![[2.0], [3.0]])
        .unwrap();
    let inputs = array![[1.0, 2.0], [3.0, 4.0]];
    layer.forward_batch(inputs.view()).unwrap();

    let errors = array![[1.0], [0.5]];
    let (adjusted, weight_grad, bias_grad) = layer.backward_batch(errors.view()).unwrap();
    assert_eq!(adjusted, errors);
    assert_eq!(weight_grad, array![[2.5f32], [4.0]]);
    assert_eq!(bias_grad, array![1.5f32]);
}

#[test]
fn test_he_normal_is_seeded() {
    let init = WeightInit::he_normal();
    let a = init.initialize(&[4, 3], FanIn::Leading, &mut rng()).unwrap();
    let b = init.initialize(&[4, 3], FanIn::Leading, &mut rng()).unwrap();
    let c = init
        .initialize(&[4, 3], FanIn::Leading, &mut StdRng::seed_from_u64(18))
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_he_normal_scale() {
    let init = WeightInit::he_normal();
    let weights = init.initialize(&[100, 200], FanIn::Leading, &mut rng()).unwrap();
    let var = weights.iter().map(|&w| w * w).sum::<f32>() / weights.len() as f32;
    // std = sqrt(1 / fan_in) with fan_in = 100
    assert!((var - 0.01).abs() < 0.002, "variance {}", var);
}

#[test]
fn test_he_normal_needs_fan_in() {
    let init = WeightInit::he_normal();
    assert!(init.initialize(&[0, 3], FanIn::Leading, &mut rng()).is_err());
}

#[test]
fn test_constant_init() {
    let biases = WeightInit::Constant(0.1)
        .initialize(&[3], FanIn::Leading, &mut rng())
        .unwrap();
    assert_eq!(biases, ArrayD::from_elem(IxDyn(&[3]), 0.1f32));
}

#[test]
fn test_conv_same_padding_keeps_size() {
    let layer = Conv2DLayer::new(
        1,
        4,
        (3, 3),
        (1, 1),
        Conv2DLayer::same_padding((3, 3)),
        Activation::leaky_rectify(),
        WeightInit::he_normal(),
        WeightInit::Constant(0.1),
        &mut rng(),
    )
    .unwrap();
    assert_eq!(layer.output_dims(5, 7).unwrap(), (5, 7));
    assert_eq!(layer.kernels.shape(), [4, 1, 3, 3]);

    let input = Array4::ones((2, 1, 5, 7));
    let output = layer.predict_batch(input.view()).unwrap();
    assert_eq!(output.shape(), [2, 4, 5, 7]);
}

#[test]
fn test_conv_1x1_forward() {
    let mut layer = Conv2DLayer::new(
        1,
        2,
        (1, 1),
        (1, 1),
        (0, 0),
        Activation::leaky_rectify(),
        WeightInit::Constant(0.0),
        WeightInit::Constant(0.1),
        &mut rng(),
    )
    .unwrap();
    layer.kernels = Array4::from_shape_vec((2, 1, 1, 1), vec![2.0, -1.0]).unwrap();

    let input = Array4::from_shape_vec((1, 1, 1, 2), vec![1.0, 0.0]).unwrap();
    let output = layer.forward_batch(input.view()).unwrap();
    // filter 0: 2x + 0.1, filter 1: leaky(-x + 0.1)
    let expected = [2.1f32, 0.1, -0.009, 0.1];
    for (o, e) in output.iter().zip(expected.iter()) {
        assert!((o - e).abs() < 1e-6, "{} vs {}", o, e);
    }
}

#[test]
fn test_conv_rejects_wrong_channels() {
    let layer = Conv2DLayer::new(
        1,
        2,
        (1, 1),
        (1, 1),
        (0, 0),
        Activation::Linear,
        WeightInit::he_normal(),
        WeightInit::Constant(0.0),
        &mut rng(),
    )
    .unwrap();
    let input = Array4::zeros((1, 3, 2, 2));
    assert!(layer.predict_batch(input.view()).is_err());
}

#[test]
fn test_conv_zero_stride_rejected() {
    let result = Conv2DLayer::new(
        1,
        2,
        (1, 1),
        (0, 1),
        (0, 0),
        Activation::Linear,
        WeightInit::he_normal(),
        WeightInit::Constant(0.0),
        &mut rng(),
    );
    assert!(matches!(result, Err(QNetError::InvalidParameter { .. })));
}

#[test]
fn test_conv_params_order() {
    let layer = Conv2DLayer::new(
        1,
        3,
        (1, 1),
        (1, 1),
        (0, 0),
        Activation::leaky_rectify(),
        WeightInit::he_normal(),
        WeightInit::Constant(0.1),
        &mut rng(),
    )
    .unwrap();
    let params = layer.params();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].shape(), [3, 1, 1, 1]);
    assert_eq!(params[1].shape(), [3]);
}
