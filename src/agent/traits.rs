use ndarray::{Array1, ArrayViewD};

use crate::agent::batch::TransitionBatch;
use crate::agent::qnetwork::QNetwork;
use crate::error::{QNetError, Result};
use crate::network::{GraphBuilder, ParamSet};

/// Interface a training loop drives: batched updates, single-state
/// inference and bulk parameter access.
pub trait ValueEstimator {
    /// Train on one batch and return the loss.
    fn train(&mut self, batch: &TransitionBatch) -> Result<f32>;

    /// Get Q-values for a single encoded state
    fn q_values(&mut self, state: ArrayViewD<f32>) -> Result<Array1<f32>>;

    /// Get the value of a state (max Q-value)
    fn state_value(&mut self, state: ArrayViewD<f32>) -> Result<f32> {
        let q_values = self.q_values(state)?;
        Ok(q_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)))
    }

    /// Index of the highest Q-value; ties go to the lowest index.
    fn greedy_action(&mut self, state: ArrayViewD<f32>) -> Result<usize> {
        let q_values = self.q_values(state)?;
        q_values
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (idx, &q)| match best {
                Some((_, best_q)) if best_q >= q => best,
                _ => Some((idx, q)),
            })
            .map(|(idx, _)| idx)
            .ok_or_else(|| QNetError::TrainingError("no Q-values to choose from".to_string()))
    }

    fn get_params(&self) -> ParamSet;

    fn set_params(&mut self, params: &ParamSet) -> Result<()>;

    /// Called by the training loop when an episode ends.
    fn finish_episode(&mut self) {}
}

impl<B: GraphBuilder> ValueEstimator for QNetwork<B> {
    fn train(&mut self, batch: &TransitionBatch) -> Result<f32> {
        QNetwork::train(self, batch)
    }

    fn q_values(&mut self, state: ArrayViewD<f32>) -> Result<Array1<f32>> {
        self.get_q_values(state)
    }

    fn get_params(&self) -> ParamSet {
        QNetwork::get_params(self)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        QNetwork::set_params(self, params)
    }

    fn finish_episode(&mut self) {
        QNetwork::finish_episode(self)
    }
}
