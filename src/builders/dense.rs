use log::debug;
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD, Ix2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{QNetError, Result};
use crate::layers::{DenseLayer, LayerTrait, WeightInit};
use crate::loss::Aggregation;
use crate::network::{GraphBuilder, QGraph};

/// Bias every hidden unit starts from.
pub const HIDDEN_BIAS: f32 = 0.1;

/// Builds fully-connected Q graphs over flat feature vectors.
///
/// Every hidden layer takes the raw input as its source rather than the
/// previous hidden layer, and only the last one built feeds the output layer.
/// Earlier branches still consume random draws during construction but are
/// unreachable from the output, so they own no parameters in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseBuilder {
    pub input_dim: usize,
    pub num_hidden_layers: usize,
    pub num_hidden: usize,
}

impl DenseBuilder {
    pub fn new(input_dim: usize, num_hidden_layers: usize, num_hidden: usize) -> Self {
        DenseBuilder {
            input_dim,
            num_hidden_layers,
            num_hidden,
        }
    }
}

impl GraphBuilder for DenseBuilder {
    type Graph = DenseGraph;

    fn feature_shape(&self) -> Vec<usize> {
        vec![self.input_dim]
    }

    fn aggregation(&self) -> Aggregation {
        Aggregation::Sum
    }

    fn build<R: Rng + ?Sized>(&self, output_dim: usize, batch_size: usize, rng: &mut R) -> Result<DenseGraph> {
        if self.input_dim == 0 || output_dim == 0 || batch_size == 0 {
            return Err(QNetError::invalid_parameter(
                "dimensions".to_string(),
                format!(
                    "input_dim ({}), output_dim ({}) and batch_size ({}) must be positive",
                    self.input_dim, output_dim, batch_size
                ),
            ));
        }
        if self.num_hidden_layers > 0 && self.num_hidden == 0 {
            return Err(QNetError::invalid_parameter(
                "num_hidden".to_string(),
                "must be positive when hidden layers are requested".to_string(),
            ));
        }

        let mut hidden = None;
        for _ in 0..self.num_hidden_layers {
            hidden = Some(DenseLayer::new(
                self.input_dim,
                self.num_hidden,
                Activation::leaky_rectify(),
                WeightInit::he_normal(),
                WeightInit::Constant(HIDDEN_BIAS),
                rng,
            )?);
        }
        if self.num_hidden_layers > 1 {
            debug!(
                "{} hidden branches built from the input; only the last feeds the output",
                self.num_hidden_layers
            );
        }

        let output_input = hidden.as_ref().map_or(self.input_dim, |layer| layer.output_size());
        let output = DenseLayer::new(
            output_input,
            output_dim,
            Activation::Linear,
            WeightInit::he_normal(),
            WeightInit::Constant(0.0),
            rng,
        )?;

        Ok(DenseGraph {
            batch_size,
            feature_shape: vec![self.input_dim],
            hidden,
            output,
        })
    }
}

/// Input, at most one reachable hidden layer, linear output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseGraph {
    batch_size: usize,
    feature_shape: Vec<usize>,
    pub hidden: Option<DenseLayer>,
    pub output: DenseLayer,
}

impl DenseGraph {
    fn as_matrix<'a>(&self, states: ArrayViewD<'a, f32>) -> Result<ArrayView2<'a, f32>> {
        self.check_states(&states)?;
        Ok(states.into_dimensionality::<Ix2>()?)
    }
}

impl QGraph for DenseGraph {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn feature_shape(&self) -> &[usize] {
        &self.feature_shape
    }

    fn output_dim(&self) -> usize {
        self.output.output_size()
    }

    fn forward(&mut self, states: ArrayViewD<f32>) -> Result<Array2<f32>> {
        let inputs = self.as_matrix(states)?;
        match self.hidden.as_mut() {
            Some(hidden) => {
                let activations = hidden.forward_batch(inputs)?;
                self.output.forward_batch(activations.view())
            }
            None => self.output.forward_batch(inputs),
        }
    }

    fn predict(&self, states: ArrayViewD<f32>) -> Result<Array2<f32>> {
        let inputs = self.as_matrix(states)?;
        match self.hidden.as_ref() {
            Some(hidden) => {
                let activations = hidden.predict_batch(inputs)?;
                self.output.predict_batch(activations.view())
            }
            None => self.output.predict_batch(inputs),
        }
    }

    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>> {
        let (adjusted, output_w, output_b) = self.output.backward_batch(output_gradient)?;
        let mut gradients = Vec::with_capacity(4);
        if let Some(hidden) = self.hidden.as_ref() {
            let hidden_error = adjusted.dot(&self.output.weights.t());
            let (_, hidden_w, hidden_b) = hidden.backward_batch(hidden_error.view())?;
            gradients.push(hidden_w.into_dyn());
            gradients.push(hidden_b.into_dyn());
        }
        gradients.push(output_w.into_dyn());
        gradients.push(output_b.into_dyn());
        Ok(gradients)
    }

    fn params(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut params = Vec::with_capacity(4);
        if let Some(hidden) = self.hidden.as_ref() {
            params.extend(hidden.params());
        }
        params.extend(self.output.params());
        params
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut params = Vec::with_capacity(4);
        if let Some(hidden) = self.hidden.as_mut() {
            params.extend(hidden.params_mut());
        }
        params.extend(self.output.params_mut());
        params
    }

    fn regularizable(&self) -> Vec<bool> {
        let mut flags = Vec::with_capacity(4);
        if let Some(hidden) = self.hidden.as_ref() {
            flags.extend(hidden.regularizable());
        }
        flags.extend(self.output.regularizable());
        flags
    }
}
