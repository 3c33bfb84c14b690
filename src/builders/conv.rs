use ndarray::{Array2, ArrayD, ArrayView2, ArrayView4, ArrayViewD, ArrayViewMutD, Ix4};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{QNetError, Result};
use crate::layers::{Conv2DLayer, DenseLayer, LayerTrait, WeightInit};
use crate::loss::Aggregation;
use crate::network::{GraphBuilder, QGraph};
use super::dense::HIDDEN_BIAS;

/// Filter size of the single convolution.
pub const FILTER_SIZE: (usize, usize) = (1, 1);

/// Builds Q graphs over single-channel grids: one convolution with
/// `num_hidden` filters, then a linear output layer over the flattened maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvBuilder {
    /// Grid height and width of one encoded state.
    pub input_shape: (usize, usize),
    pub num_hidden: usize,
}

impl ConvBuilder {
    pub fn new(input_shape: (usize, usize), num_hidden: usize) -> Self {
        ConvBuilder { input_shape, num_hidden }
    }
}

impl GraphBuilder for ConvBuilder {
    type Graph = ConvGraph;

    fn feature_shape(&self) -> Vec<usize> {
        vec![1, self.input_shape.0, self.input_shape.1]
    }

    fn aggregation(&self) -> Aggregation {
        Aggregation::Mean
    }

    fn build<R: Rng + ?Sized>(&self, output_dim: usize, batch_size: usize, rng: &mut R) -> Result<ConvGraph> {
        let (height, width) = self.input_shape;
        if height == 0 || width == 0 || self.num_hidden == 0 || output_dim == 0 || batch_size == 0 {
            return Err(QNetError::invalid_parameter(
                "dimensions".to_string(),
                format!(
                    "input_shape {:?}, num_hidden ({}), output_dim ({}) and batch_size ({}) must be positive",
                    self.input_shape, self.num_hidden, output_dim, batch_size
                ),
            ));
        }

        let conv = Conv2DLayer::new(
            1,
            self.num_hidden,
            FILTER_SIZE,
            (1, 1),
            Conv2DLayer::same_padding(FILTER_SIZE),
            Activation::leaky_rectify(),
            WeightInit::he_normal(),
            WeightInit::Constant(HIDDEN_BIAS),
            rng,
        )?;
        let map_dims = conv.output_dims(height, width)?;
        let flat = self.num_hidden * map_dims.0 * map_dims.1;
        let output = DenseLayer::new(
            flat,
            output_dim,
            Activation::Linear,
            WeightInit::he_normal(),
            WeightInit::Constant(0.0),
            rng,
        )?;

        Ok(ConvGraph {
            batch_size,
            feature_shape: self.feature_shape(),
            map_dims,
            conv,
            output,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvGraph {
    batch_size: usize,
    feature_shape: Vec<usize>,
    /// Spatial size of the convolution output.
    map_dims: (usize, usize),
    pub conv: Conv2DLayer,
    pub output: DenseLayer,
}

impl ConvGraph {
    fn as_grids<'a>(&self, states: ArrayViewD<'a, f32>) -> Result<ArrayView4<'a, f32>> {
        self.check_states(&states)?;
        Ok(states.into_dimensionality::<Ix4>()?)
    }

    fn flat_width(&self) -> usize {
        self.conv.out_channels() * self.map_dims.0 * self.map_dims.1
    }
}

impl QGraph for ConvGraph {
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
        let grids = self.as_grids(states)?;
        let flat_width = self.flat_width();
        let maps = self.conv.forward_batch(grids)?;
        let flat = maps.into_shape((self.batch_size, flat_width))?;
        self.output.forward_batch(flat.view())
    }

    fn predict(&self, states: ArrayViewD<f32>) -> Result<Array2<f32>> {
        let grids = self.as_grids(states)?;
        let maps = self.conv.predict_batch(grids)?;
        let flat = maps.into_shape((self.batch_size, self.flat_width()))?;
        self.output.predict_batch(flat.view())
    }

    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>> {
        let (adjusted, output_w, output_b) = self.output.backward_batch(output_gradient)?;
        let map_error = adjusted.dot(&self.output.weights.t()).into_shape((
            self.batch_size,
            self.conv.out_channels(),
            self.map_dims.0,
            self.map_dims.1,
        ))?;
        let (kernel_grad, conv_bias_grad) = self.conv.backward_batch(map_error.view())?;
        Ok(vec![
            kernel_grad.into_dyn(),
            conv_bias_grad.into_dyn(),
            output_w.into_dyn(),
            output_b.into_dyn(),
        ])
    }

    fn params(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut params = self.conv.params();
        params.extend(self.output.params());
        params
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut params = self.conv.params_mut();
        params.extend(self.output.params_mut());
        params
    }

    fn regularizable(&self) -> Vec<bool> {
        let mut flags = self.conv.regularizable();
        flags.extend(self.output.regularizable());
        flags
    }
}
