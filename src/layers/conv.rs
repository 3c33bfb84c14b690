//! 2D convolution over single- or multi-channel grids.

use ndarray::{s, Array1, Array4, ArrayView4, ArrayViewD, ArrayViewMutD, Axis, Ix1, Ix4};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{QNetError, Result};
use super::initialization::{FanIn, WeightInit};
use super::traits::Layer as LayerTrait;

/// 2D Convolutional Layer
///
/// Input and output are laid out `[batch, channels, height, width]`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conv2DLayer {
    /// Convolution kernels [out_channels, in_channels, kernel_height, kernel_width]
    pub kernels: Array4<f32>,

    /// Bias terms for each output channel
    pub biases: Array1<f32>,

    pub activation: Activation,

    pub stride: (usize, usize),

    /// Zero padding added on each side
    pub padding: (usize, usize),

    #[serde(skip)]
    cached_input: Option<Array4<f32>>,

    #[serde(skip)]
    cached_pre_activation: Option<Array4<f32>>,
}

impl Conv2DLayer {
    /// Create a new 2D convolutional layer
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        activation: Activation,
        weight_init: WeightInit,
        bias_init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if stride.0 == 0 || stride.1 == 0 {
            return Err(QNetError::invalid_parameter(
                "stride".to_string(),
                format!("must be positive, got {:?}", stride),
            ));
        }
        let kernels = weight_init
            .initialize(
                &[out_channels, in_channels, kernel_size.0, kernel_size.1],
                FanIn::Trailing,
                rng,
            )?
            .into_dimensionality::<Ix4>()?;
        let biases = bias_init
            .initialize(&[out_channels], FanIn::Leading, rng)?
            .into_dimensionality::<Ix1>()?;

        Ok(Conv2DLayer {
            kernels,
            biases,
            activation,
            stride,
            padding,
            cached_input: None,
            cached_pre_activation: None,
        })
    }

    /// Padding that keeps the spatial size unchanged at stride 1 for odd kernels.
    pub fn same_padding(kernel_size: (usize, usize)) -> (usize, usize) {
        (kernel_size.0 / 2, kernel_size.1 / 2)
    }

    pub fn in_channels(&self) -> usize {
        self.kernels.shape()[1]
    }

    pub fn out_channels(&self) -> usize {
        self.kernels.shape()[0]
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        (self.kernels.shape()[2], self.kernels.shape()[3])
    }

    /// Spatial size of the output for an input of the given height and width.
    pub fn output_dims(&self, in_height: usize, in_width: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.kernel_size();
        let padded_h = in_height + 2 * self.padding.0;
        let padded_w = in_width + 2 * self.padding.1;
        if padded_h < kh || padded_w < kw {
            return Err(QNetError::dimension_mismatch(
                format!("padded input of at least {}x{}", kh, kw),
                format!("{}x{}", padded_h, padded_w),
            ));
        }
        Ok(((padded_h - kh) / self.stride.0 + 1, (padded_w - kw) / self.stride.1 + 1))
    }

    fn pad_input(&self, input: ArrayView4<f32>) -> Array4<f32> {
        let (batch_size, channels, height, width) = input.dim();
        if self.padding == (0, 0) {
            return input.to_owned();
        }
        let mut padded = Array4::zeros((
            batch_size,
            channels,
            height + 2 * self.padding.0,
            width + 2 * self.padding.1,
        ));
        padded
            .slice_mut(s![
                ..,
                ..,
                self.padding.0..self.padding.0 + height,
                self.padding.1..self.padding.1 + width
            ])
            .assign(&input);
        padded
    }

    fn convolve2d(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (batch_size, channels, in_height, in_width) = input.dim();
        if channels != self.in_channels() {
            return Err(QNetError::dimension_mismatch(
                format!("{} input channels", self.in_channels()),
                format!("{} input channels", channels),
            ));
        }
        let (out_height, out_width) = self.output_dims(in_height, in_width)?;
        let (kh_size, kw_size) = self.kernel_size();
        let padded = self.pad_input(input);

        let mut output = Array4::zeros((batch_size, self.out_channels(), out_height, out_width));
        for b in 0..batch_size {
            for oc in 0..self.out_channels() {
                for oh in 0..out_height {
                    for ow in 0..out_width {
                        let h_start = oh * self.stride.0;
                        let w_start = ow * self.stride.1;
                        let mut sum = 0.0;
                        for ic in 0..channels {
                            for kh in 0..kh_size {
                                for kw in 0..kw_size {
                                    sum += padded[[b, ic, h_start + kh, w_start + kw]]
                                        * self.kernels[[oc, ic, kh, kw]];
                                }
                            }
                        }
                        output[[b, oc, oh, ow]] = sum + self.biases[oc];
                    }
                }
            }
        }
        Ok(output)
    }

    /// Forward pass for a batch of grids, caching what the backward pass needs.
    pub fn forward_batch(&mut self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let pre_activation = self.convolve2d(input)?;
        self.cached_input = Some(input.to_owned());
        self.cached_pre_activation = Some(pre_activation.clone());
        let mut output = pre_activation;
        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Forward pass without caching.
    pub fn predict_batch(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut output = self.convolve2d(input)?;
        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Backward pass; returns kernel and bias gradients.
    ///
    /// Gradients with respect to the input are not produced: the layer only
    /// ever sits directly on top of the raw state.
    pub fn backward_batch(&self, output_gradient: ArrayView4<f32>) -> Result<(Array4<f32>, Array1<f32>)> {
        let (input, pre_activation) =
            match (self.cached_input.as_ref(), self.cached_pre_activation.as_ref()) {
                (Some(input), Some(pre)) => (input, pre),
                _ => {
                    return Err(QNetError::TrainingError(
                        "forward_batch() must be called before backward_batch()".to_string(),
                    ))
                }
            };
        if output_gradient.dim() != pre_activation.dim() {
            return Err(QNetError::dimension_mismatch(
                format!("{:?}", pre_activation.dim()),
                format!("{:?}", output_gradient.dim()),
            ));
        }

        let grad = &output_gradient * &self.activation.derivative(pre_activation.view());
        let kernel_gradients = self.compute_kernel_gradients(input.view(), &grad);
        let bias_gradients = grad.sum_axis(Axis(3)).sum_axis(Axis(2)).sum_axis(Axis(0));

        Ok((kernel_gradients, bias_gradients))
    }

    fn compute_kernel_gradients(&self, input: ArrayView4<f32>, grad_output: &Array4<f32>) -> Array4<f32> {
        let mut kernel_grads = Array4::zeros(self.kernels.dim());
        let padded = self.pad_input(input);
        let (batch_size, _, out_height, out_width) = grad_output.dim();
        let (kh_size, kw_size) = self.kernel_size();

        for oc in 0..self.out_channels() {
            for ic in 0..self.in_channels() {
                for kh in 0..kh_size {
                    for kw in 0..kw_size {
                        let mut sum = 0.0;
                        for b in 0..batch_size {
                            for oh in 0..out_height {
                                for ow in 0..out_width {
                                    sum += padded[[b, ic, oh * self.stride.0 + kh, ow * self.stride.1 + kw]]
                                        * grad_output[[b, oc, oh, ow]];
                                }
                            }
                        }
                        kernel_grads[[oc, ic, kh, kw]] = sum;
                    }
                }
            }
        }
        kernel_grads
    }
}

impl LayerTrait for Conv2DLayer {
    fn params(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.kernels.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.kernels.view_mut().into_dyn(), self.biases.view_mut().into_dyn()]
    }

    fn output_size(&self) -> usize {
        self.out_channels()
    }
}
