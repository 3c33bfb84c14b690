use ndarray::{Array1, ArrayView1};
use serde::{Serialize, Deserialize};

/// How per-row losses are reduced to a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Sum,
    Mean,
}

impl Aggregation {
    /// Factor every row's contribution is multiplied by.
    pub fn scale(&self, rows: usize) -> f32 {
        match self {
            Aggregation::Sum => 1.0,
            Aggregation::Mean if rows == 0 => 0.0,
            Aggregation::Mean => 1.0 / rows as f32,
        }
    }
}

/// Trait defining the interface for loss functions over one prediction per row
pub trait Loss: Send + Sync {
    /// Loss contributed by each row.
    fn row_losses(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32>;

    /// Gradient of the per-row loss with respect to each prediction, before aggregation.
    fn row_gradients(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32>;

    fn aggregation(&self) -> Aggregation;

    /// Aggregated scalar loss.
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
        let scale = self.aggregation().scale(predictions.len());
        self.row_losses(predictions, targets).sum() * scale
    }

    /// Gradient of [`Loss::compute`] with respect to each prediction.
    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        let scale = self.aggregation().scale(predictions.len());
        self.row_gradients(predictions, targets) * scale
    }
}

/// Huber loss with the error split into a quadratic and a linear part:
/// `quad = min(|d|, delta)`, `lin = |d| - quad`, `loss = 0.5 * quad^2 + delta * lin`.
///
/// The linear part keeps a constant-magnitude gradient past `delta` instead of
/// the zero gradient a clipped square would give.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuberLoss {
    pub delta: f32,
    pub aggregation: Aggregation,
}

impl HuberLoss {
    pub fn new(delta: f32, aggregation: Aggregation) -> Self {
        HuberLoss { delta, aggregation }
    }

    /// Loss of a single TD error.
    #[inline]
    pub fn row_loss(&self, diff: f32) -> f32 {
        let quadratic_part = diff.abs().min(self.delta);
        let linear_part = diff.abs() - quadratic_part;
        0.5 * quadratic_part * quadratic_part + self.delta * linear_part
    }

    /// Derivative of [`HuberLoss::row_loss`] with respect to the error.
    #[inline]
    pub fn row_slope(&self, diff: f32) -> f32 {
        diff.clamp(-self.delta, self.delta)
    }
}

impl Loss for HuberLoss {
    fn row_losses(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        let mut diff = &targets - &predictions;
        diff.mapv_inplace(|d| self.row_loss(d));
        diff
    }

    fn row_gradients(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        // diff = target - prediction, so d(loss)/d(prediction) = -slope(diff)
        let mut diff = &targets - &predictions;
        diff.mapv_inplace(|d| -self.row_slope(d));
        diff
    }

    fn aggregation(&self) -> Aggregation {
        self.aggregation
    }
}
