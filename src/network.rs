//! The differentiable graph contract shared by every function approximator,
//! and the Parameter Set that fully describes a graph's trainable state.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{QNetError, Result};
use crate::loss::Aggregation;

/// Ordered sequence of parameter arrays, input-to-output, weights before biases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSet(Vec<ArrayD<f32>>);

impl ParamSet {
    pub fn new(arrays: Vec<ArrayD<f32>>) -> Self {
        ParamSet(arrays)
    }

    pub fn arrays(&self) -> &[ArrayD<f32>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ArrayD<f32>> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArrayD<f32>> {
        self.0.iter()
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.0.iter().map(|a| a.shape().to_vec()).collect()
    }

    /// Save the parameters to a file with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }

    /// Load parameters previously written by [`ParamSet::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(deserialize(&buffer)?)
    }
}

impl From<Vec<ArrayD<f32>>> for ParamSet {
    fn from(arrays: Vec<ArrayD<f32>>) -> Self {
        ParamSet(arrays)
    }
}

impl<'a> IntoIterator for &'a ParamSet {
    type Item = &'a ArrayD<f32>;
    type IntoIter = std::slice::Iter<'a, ArrayD<f32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A differentiable graph mapping a fixed-size batch of encoded states to one
/// value per action.
pub trait QGraph: Clone + Send {
    /// Batch dimension the graph was built for.
    fn batch_size(&self) -> usize;

    /// Shape of a single encoded state.
    fn feature_shape(&self) -> &[usize];

    fn output_dim(&self) -> usize;

    /// Forward pass that records what [`QGraph::backward`] needs.
    fn forward(&mut self, states: ArrayViewD<f32>) -> Result<Array2<f32>>;

    /// Forward pass with no gradient bookkeeping.
    fn predict(&self, states: ArrayViewD<f32>) -> Result<Array2<f32>>;

    /// Gradients of a loss with respect to every parameter, given the gradient
    /// with respect to the outputs of the last [`QGraph::forward`] call.
    /// Returned in Parameter Set order.
    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>>;

    fn params(&self) -> Vec<ArrayViewD<'_, f32>>;

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>>;

    /// Per-parameter flag, aligned with [`QGraph::params`], selecting the
    /// arrays that carry L2 regularization.
    fn regularizable(&self) -> Vec<bool>;

    /// Owned copy of the current parameters.
    fn param_set(&self) -> ParamSet {
        ParamSet::new(self.params().iter().map(|p| p.to_owned()).collect())
    }

    /// Replace every parameter. Shapes are checked up front so a mismatch
    /// leaves the graph untouched.
    fn load_params(&mut self, params: &ParamSet) -> Result<()> {
        let expected: Vec<Vec<usize>> = self.params().iter().map(|p| p.shape().to_vec()).collect();
        if expected != params.shapes() {
            return Err(QNetError::dimension_mismatch(
                format!("{:?}", expected),
                format!("{:?}", params.shapes()),
            ));
        }
        for (target, source) in self.params_mut().iter_mut().zip(params) {
            target.assign(source);
        }
        Ok(())
    }

    /// Sum of squares over every regularizable parameter.
    fn l2_penalty(&self) -> f32 {
        self.params()
            .iter()
            .zip(self.regularizable())
            .filter(|(_, regularize)| *regularize)
            .map(|(p, _)| p.iter().map(|&w| w * w).sum::<f32>())
            .sum()
    }

    /// Checks a batch of states against `(batch_size, *feature_shape)`.
    fn check_states(&self, states: &ArrayViewD<f32>) -> Result<()> {
        let mut expected = vec![self.batch_size()];
        expected.extend_from_slice(self.feature_shape());
        if states.shape() != expected.as_slice() {
            return Err(QNetError::dimension_mismatch(
                format!("{:?}", expected),
                format!("{:?}", states.shape()),
            ));
        }
        Ok(())
    }
}

/// Constructs graphs of one architecture. The estimator uses the same builder
/// for its live and target graphs.
pub trait GraphBuilder {
    type Graph: QGraph;

    /// Shape of a single encoded state accepted by built graphs.
    fn feature_shape(&self) -> Vec<usize>;

    /// How per-transition losses are reduced for this architecture.
    fn aggregation(&self) -> Aggregation;

    fn build<R: Rng + ?Sized>(&self, output_dim: usize, batch_size: usize, rng: &mut R) -> Result<Self::Graph>;
}
