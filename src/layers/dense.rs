use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Axis, Ix1, Ix2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{QNetError, Result};
use super::initialization::{FanIn, WeightInit};
use super::traits::Layer as LayerTrait;

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer whose weights and biases are drawn from the given
    /// initializers using the caller's random source.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        weight_init: WeightInit,
        bias_init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = weight_init
            .initialize(&[input_size, output_size], FanIn::Leading, rng)?
            .into_dimensionality::<Ix2>()?;
        let biases = bias_init
            .initialize(&[output_size], FanIn::Leading, rng)?
            .into_dimensionality::<Ix1>()?;
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        })
    }

    /// Replace the weights, keeping the layer's shape.
    pub fn with_weights(mut self, weights: Array2<f32>) -> Result<Self> {
        if weights.dim() != self.weights.dim() {
            return Err(QNetError::dimension_mismatch(
                format!("weights {:?}", self.weights.dim()),
                format!("weights {:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.len() != self.biases.len() {
            return Err(QNetError::dimension_mismatch(
                format!("{} biases", self.biases.len()),
                format!("{} biases", biases.len()),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    fn affine(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.weights.nrows() {
            return Err(QNetError::dimension_mismatch(
                format!("{} input features", self.weights.nrows()),
                format!("{} input features", inputs.ncols()),
            ));
        }
        Ok(inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0)))
    }

    /// Perform a forward pass for a batch of input vectors, caching what the
    /// backward pass needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut outputs = self.affine(inputs)?;
        self.inputs = Some(inputs.to_owned());
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply(&mut outputs);
        Ok(outputs)
    }

    /// Forward pass without caching; leaves any stored training state untouched.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut outputs = self.affine(inputs)?;
        self.activation.apply(&mut outputs);
        Ok(outputs)
    }

    /// Compute gradients for a batch of output errors.
    ///
    /// Returns the error adjusted by the activation derivative together with the
    /// weight and bias gradients. The caller propagates the adjusted error to the
    /// layer's input with `adjusted.dot(&weights.t())`.
    pub fn backward_batch(
        &self,
        output_errors: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let (pre_activation_output, inputs) =
            match (self.pre_activation_output.as_ref(), self.inputs.as_ref()) {
                (Some(pre), Some(inputs)) => (pre, inputs),
                _ => {
                    return Err(QNetError::TrainingError(
                        "forward_batch() must be called before backward_batch()".to_string(),
                    ))
                }
            };
        if output_errors.dim() != pre_activation_output.dim() {
            return Err(QNetError::dimension_mismatch(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let activation_deriv = self.activation.derivative(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));

        Ok((adjusted_error, weight_gradients, bias_gradients))
    }
}

impl LayerTrait for DenseLayer {
    fn params(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.weights.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.weights.view_mut().into_dyn(), self.biases.view_mut().into_dyn()]
    }

    fn output_size(&self) -> usize {
        self.weights.ncols()
    }
}
