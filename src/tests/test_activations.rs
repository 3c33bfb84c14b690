use ndarray::{array, Array2};
use crate::activations::{Activation, DEFAULT_LEAKINESS};

#[test]
fn test_leaky_rectify_is_default() {
    assert_eq!(Activation::default(), Activation::LeakyRelu { alpha: 0.01 });
    assert_eq!(Activation::leaky_rectify(), Activation::LeakyRelu { alpha: DEFAULT_LEAKINESS });
}

#[test]
fn test_leaky_relu_activation() {
    let activation = Activation::leaky_rectify();
    let mut input = array![2.0f32, -1.0, 0.0, -100.0];
    activation.apply(&mut input);
    assert_eq!(input, array![2.0f32, -0.01, 0.0, -1.0]);
}

#[test]
fn test_leaky_relu_derivative() {
    let activation = Activation::leaky_rectify();
    let input = array![3.0f32, -3.0, 0.0];
    let derivative = activation.derivative(input.view());
    assert_eq!(derivative, array![1.0f32, 0.01, 0.01]);
}

#[test]
fn test_linear_activation() {
    let mut input = array![[1.5f32, -2.5], [0.0, 7.0]];
    let original = input.clone();
    Activation::Linear.apply(&mut input);
    assert_eq!(input, original);
    assert_eq!(Activation::Linear.derivative(input.view()), Array2::<f32>::ones((2, 2)));
}

#[test]
fn test_relu_activation() {
    let mut input = array![1.0f32, -1.0];
    Activation::Relu.apply(&mut input);
    assert_eq!(input, array![1.0f32, 0.0]);
    assert_eq!(Activation::Relu.slope(-1.0), 0.0);
    assert_eq!(Activation::Relu.slope(1.0), 1.0);
}

#[test]
fn test_activation_serde_round_trip() {
    let activation = Activation::LeakyRelu { alpha: 0.2 };
    let json = serde_json::to_string(&activation).unwrap();
    let restored: Activation = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, activation);
}
