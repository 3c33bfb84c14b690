use ndarray::{ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand_distr::Normal;
use rand::Rng;

use crate::error::{QNetError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// He/Kaiming normal initialization: `N(0, gain * sqrt(1 / fan_in))`
    HeNormal { gain: f32 },

    /// Every element set to the same value
    Constant(f32),
}

impl WeightInit {
    /// He-normal with unit gain.
    pub fn he_normal() -> Self {
        WeightInit::HeNormal { gain: 1.0 }
    }

    /// Initialize a parameter array of the given shape.
    ///
    /// For weight matrices laid out `(in, out)` the fan-in is the first axis;
    /// for kernels laid out `(filters, channels, kh, kw)` it is the product of
    /// every axis but the first. `fan_in_axes` selects which convention applies.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        shape: &[usize],
        fan_in_axes: FanIn,
        rng: &mut R,
    ) -> Result<ArrayD<f32>> {
        match *self {
            WeightInit::HeNormal { gain } => {
                let fan_in = fan_in_axes.fan_in(shape);
                if fan_in == 0 {
                    return Err(QNetError::invalid_parameter(
                        "shape".to_string(),
                        format!("He initialization needs a non-zero fan-in, got shape {:?}", shape),
                    ));
                }
                let std = gain * (1.0 / fan_in as f32).sqrt();
                let normal = Normal::new(0.0, std).map_err(|e| {
                    QNetError::invalid_parameter("std".to_string(), e.to_string())
                })?;
                Ok(ArrayD::random_using(IxDyn(shape), normal, rng))
            }
            WeightInit::Constant(value) => Ok(ArrayD::from_elem(IxDyn(shape), value)),
        }
    }
}

/// Which axes of a parameter array count towards its fan-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanIn {
    /// Dense weights `(in, out)`: fan-in is the leading axis.
    Leading,
    /// Convolution kernels `(filters, channels, kh, kw)`: all axes after the first.
    Trailing,
}

impl FanIn {
    fn fan_in(&self, shape: &[usize]) -> usize {
        match self {
            FanIn::Leading => shape.first().copied().unwrap_or(0),
            FanIn::Trailing => shape.iter().skip(1).product(),
        }
    }
}
