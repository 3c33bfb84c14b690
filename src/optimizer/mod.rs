//! Gradient-based update rules.
//!
//! Every optimizer keeps its state aligned with the Parameter Set it was sized
//! for: state slot `i` belongs to parameter `i`, whatever its shape.

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayD, ArrayViewMutD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{QNetError, Result};

pub trait Optimizer {
    /// Apply one update to every parameter in place.
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()>;
}

/// Identifier of a parameter-update strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRule {
    #[serde(rename = "adam")]
    Adam,
    #[serde(rename = "rmsprop")]
    RmsProp,
    /// Plain gradient step followed by Nesterov momentum.
    #[serde(rename = "sgd")]
    Sgd,
}

impl FromStr for UpdateRule {
    type Err = QNetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adam" => Ok(UpdateRule::Adam),
            "rmsprop" => Ok(UpdateRule::RmsProp),
            "sgd" => Ok(UpdateRule::Sgd),
            other => Err(QNetError::UnknownUpdateRule(other.to_string())),
        }
    }
}

impl fmt::Display for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateRule::Adam => "adam",
            UpdateRule::RmsProp => "rmsprop",
            UpdateRule::Sgd => "sgd",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(NesterovMomentum<SGD>),
    Adam(Adam),
    RMSProp(RMSProp),
}

impl OptimizerWrapper {
    /// Build the optimizer for `rule` with state sized to `shapes`.
    pub fn for_rule(rule: UpdateRule, shapes: &[Vec<usize>]) -> Self {
        match rule {
            UpdateRule::Adam => OptimizerWrapper::Adam(Adam::default(shapes)),
            UpdateRule::RmsProp => OptimizerWrapper::RMSProp(RMSProp::default(shapes)),
            UpdateRule::Sgd => OptimizerWrapper::SGD(NesterovMomentum::default(SGD::new(), shapes)),
        }
    }

    pub fn rule(&self) -> UpdateRule {
        match self {
            OptimizerWrapper::SGD(_) => UpdateRule::Sgd,
            OptimizerWrapper::Adam(_) => UpdateRule::Adam,
            OptimizerWrapper::RMSProp(_) => UpdateRule::RmsProp,
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(params, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(params, gradients, learning_rate),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.step(params, gradients, learning_rate),
        }
    }
}

fn zeros_like(shapes: &[Vec<usize>]) -> Vec<ArrayD<f32>> {
    shapes.iter().map(|shape| ArrayD::zeros(IxDyn(shape))).collect()
}

/// Checks that parameters, gradients and optimizer state line up one-to-one.
fn check_aligned(
    params: &[ArrayViewMutD<'_, f32>],
    gradients: &[ArrayD<f32>],
    state: &[ArrayD<f32>],
) -> Result<()> {
    if params.len() != gradients.len() || params.len() != state.len() {
        return Err(QNetError::dimension_mismatch(
            format!("{} parameter arrays", state.len()),
            format!("{} parameters and {} gradients", params.len(), gradients.len()),
        ));
    }
    for (i, ((param, gradient), slot)) in params.iter().zip(gradients).zip(state).enumerate() {
        if param.shape() != gradient.shape() || param.shape() != slot.shape() {
            return Err(QNetError::dimension_mismatch(
                format!("parameter {} of shape {:?}", i, slot.shape()),
                format!("parameter {:?} with gradient {:?}", param.shape(), gradient.shape()),
            ));
        }
    }
    Ok(())
}

/// Plain stochastic gradient descent: `p -= lr * g`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()> {
        if params.len() != gradients.len() {
            return Err(QNetError::dimension_mismatch(
                format!("{} gradients", params.len()),
                format!("{} gradients", gradients.len()),
            ));
        }
        for (param, gradient) in params.iter_mut().zip(gradients) {
            if param.shape() != gradient.shape() {
                return Err(QNetError::dimension_mismatch(
                    format!("{:?}", param.shape()),
                    format!("{:?}", gradient.shape()),
                ));
            }
        }
        for (param, gradient) in params.iter_mut().zip(gradients) {
            param.zip_mut_with(gradient, |p, &g| *p -= learning_rate * g);
        }
        Ok(())
    }
}

/// Nesterov momentum applied on top of another optimizer's step.
///
/// With `p'` the parameters after the inner step:
/// `x = momentum * v + (p' - p)`, `v = x`, `p = p' + momentum * x`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NesterovMomentum<O> {
    pub inner: O,
    pub momentum: f32,
    velocities: Vec<ArrayD<f32>>,
}

impl<O: Optimizer> NesterovMomentum<O> {
    pub fn new(inner: O, shapes: &[Vec<usize>], momentum: f32) -> Self {
        NesterovMomentum {
            inner,
            momentum,
            velocities: zeros_like(shapes),
        }
    }

    pub fn default(inner: O, shapes: &[Vec<usize>]) -> Self {
        Self::new(inner, shapes, 0.9)
    }
}

impl<O: Optimizer> Optimizer for NesterovMomentum<O> {
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()> {
        check_aligned(params, gradients, &self.velocities)?;
        let before: Vec<ArrayD<f32>> = params.iter().map(|p| p.to_owned()).collect();
        self.inner.step(params, gradients, learning_rate)?;

        let momentum = self.momentum;
        for ((param, previous), velocity) in params.iter_mut().zip(&before).zip(&mut self.velocities) {
            Zip::from(param)
                .and(previous)
                .and(velocity)
                .for_each(|p, &prev, v| {
                    let x = momentum * *v + (*p - prev);
                    *v = x;
                    *p += momentum * x;
                });
        }
        Ok(())
    }
}

/// Adam with bias correction folded into the step size:
/// `a_t = lr * sqrt(1 - beta2^t) / (1 - beta1^t)`, `p -= a_t * m / (sqrt(v) + epsilon)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
    /// Number of steps taken so far; shared by every parameter.
    pub t: usize,
}

impl Adam {
    pub fn new(shapes: &[Vec<usize>], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m: zeros_like(shapes),
            v: zeros_like(shapes),
            t: 0,
        }
    }

    pub fn default(shapes: &[Vec<usize>]) -> Self {
        Self::new(shapes, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()> {
        check_aligned(params, gradients, &self.m)?;
        self.t += 1;
        let t = self.t as i32;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let a_t = learning_rate * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));

        for (((param, gradient), m), v) in params
            .iter_mut()
            .zip(gradients)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            Zip::from(param)
                .and(gradient)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    *p -= a_t * *m / (v.sqrt() + epsilon);
                });
        }
        Ok(())
    }
}

/// RMSProp optimizer: `acc = rho * acc + (1 - rho) * g^2`, `p -= lr * g / sqrt(acc + epsilon)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RMSProp {
    pub rho: f32,
    pub epsilon: f32,
    accumulators: Vec<ArrayD<f32>>,
}

impl RMSProp {
    pub fn new(shapes: &[Vec<usize>], rho: f32, epsilon: f32) -> Self {
        RMSProp {
            rho,
            epsilon,
            accumulators: zeros_like(shapes),
        }
    }

    pub fn default(shapes: &[Vec<usize>]) -> Self {
        Self::new(shapes, 0.9, 1e-6)
    }
}

impl Optimizer for RMSProp {
    fn step(
        &mut self,
        params: &mut [ArrayViewMutD<'_, f32>],
        gradients: &[ArrayD<f32>],
        learning_rate: f32,
    ) -> Result<()> {
        check_aligned(params, gradients, &self.accumulators)?;
        let (rho, epsilon) = (self.rho, self.epsilon);

        for ((param, gradient), acc) in params.iter_mut().zip(gradients).zip(&mut self.accumulators) {
            Zip::from(param)
                .and(gradient)
                .and(acc)
                .for_each(|p, &g, acc| {
                    *acc = rho * *acc + (1.0 - rho) * g * g;
                    *p -= learning_rate * g / (*acc + epsilon).sqrt();
                });
        }
        Ok(())
    }
}
