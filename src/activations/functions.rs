use ndarray::{Array, ArrayView, Dimension};
use serde::{Serialize, Deserialize};

/// Slope applied to negative inputs by the leaky rectifier used in hidden layers.
pub const DEFAULT_LEAKINESS: f32 = 0.01;

/// An enumeration of the possible activation functions that can be used in a neural network layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
    LeakyRelu { alpha: f32 },
}

impl Default for Activation {
    fn default() -> Self {
        Activation::leaky_rectify()
    }
}

impl Activation {
    /// Leaky rectifier with the default leakiness of 0.01.
    pub fn leaky_rectify() -> Self {
        Activation::LeakyRelu { alpha: DEFAULT_LEAKINESS }
    }

    /// Value of the activation at a single point.
    #[inline]
    pub fn value(&self, v: f32) -> f32 {
        match *self {
            Activation::Relu => v.max(0.0),
            Activation::Linear => v,
            Activation::LeakyRelu { alpha } => if v > 0.0 { v } else { alpha * v },
        }
    }

    /// Derivative of the activation at a single point.
    #[inline]
    pub fn slope(&self, v: f32) -> f32 {
        match *self {
            Activation::Relu => if v > 0.0 { 1.0 } else { 0.0 },
            Activation::Linear => 1.0,
            Activation::LeakyRelu { alpha } => if v > 0.0 { 1.0 } else { alpha },
        }
    }

    /// Apply the activation function to an array of any dimensionality in-place.
    pub fn apply<D: Dimension>(&self, inputs: &mut Array<f32, D>) {
        if let Activation::Linear = self {
            return;
        }
        inputs.mapv_inplace(|v| self.value(v));
    }

    /// Compute the derivative of the activation function element-wise.
    pub fn derivative<D: Dimension>(&self, inputs: ArrayView<f32, D>) -> Array<f32, D> {
        inputs.mapv(|v| self.slope(v))
    }
}
