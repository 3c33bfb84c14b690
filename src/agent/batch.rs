use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{QNetError, Result};

/// One `(s, a, r, s', terminal)` step of experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: ArrayD<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: ArrayD<f32>,
    pub terminal: bool,
}

/// Five index-aligned sequences making up one training call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// `(batch, *feature_shape)`
    pub states: ArrayD<f32>,
    pub actions: Array1<usize>,
    pub rewards: Array1<f32>,
    /// `(batch, *feature_shape)`
    pub next_states: ArrayD<f32>,
    pub terminals: Array1<bool>,
}

impl TransitionBatch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Stack single transitions into a batch whose states have shape
    /// `(transitions.len(), *feature_shape)`.
    ///
    /// A state may differ from `feature_shape` only by unit axes, so a
    /// `[H, W]` grid stacks into a `[1, H, W]` feature shape.
    pub fn from_transitions(transitions: &[Transition], feature_shape: &[usize]) -> Result<Self> {
        if transitions.is_empty() {
            return Err(QNetError::invalid_parameter("transitions", "no transitions to stack"));
        }
        let mut shape = vec![transitions.len()];
        shape.extend_from_slice(feature_shape);

        let mut states = ArrayD::zeros(IxDyn(&shape));
        let mut next_states = ArrayD::zeros(IxDyn(&shape));
        for (i, transition) in transitions.iter().enumerate() {
            place_state(&mut states, i, transition.state.view())?;
            place_state(&mut next_states, i, transition.next_state.view())?;
        }

        Ok(TransitionBatch {
            states,
            actions: transitions.iter().map(|t| t.action).collect(),
            rewards: transitions.iter().map(|t| t.reward).collect(),
            next_states,
            terminals: transitions.iter().map(|t| t.terminal).collect(),
        })
    }
}

/// Copy `state` into row `index` of `batch`, allowing only unit-axis differences.
fn place_state(batch: &mut ArrayD<f32>, index: usize, state: ArrayViewD<f32>) -> Result<()> {
    let mut row = batch.index_axis_mut(Axis(0), index);
    let fits = state.len() == row.len() && state.broadcast(row.raw_dim()).is_some();
    if !fits {
        return Err(QNetError::dimension_mismatch(
            format!("{:?}", row.shape()),
            format!("{:?}", state.shape()),
        ));
    }
    row.assign(&state);
    Ok(())
}

/// Pre-allocated, fixed-size storage the estimator binds each batch into.
///
/// Rewards, actions and terminal masks are column vectors of shape `(batch, 1)`.
#[derive(Debug, Clone)]
pub struct TransitionBuffers {
    states: ArrayD<f32>,
    next_states: ArrayD<f32>,
    rewards: Array2<f32>,
    actions: Array2<usize>,
    /// 1.0 where the episode ended
    terminals: Array2<f32>,
}

impl TransitionBuffers {
    pub fn new(batch_size: usize, feature_shape: &[usize]) -> Self {
        let mut shape = vec![batch_size];
        shape.extend_from_slice(feature_shape);
        TransitionBuffers {
            states: ArrayD::zeros(IxDyn(&shape)),
            next_states: ArrayD::zeros(IxDyn(&shape)),
            rewards: Array2::zeros((batch_size, 1)),
            actions: Array2::zeros((batch_size, 1)),
            terminals: Array2::zeros((batch_size, 1)),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.rewards.nrows()
    }

    pub fn feature_shape(&self) -> &[usize] {
        &self.states.shape()[1..]
    }

    /// Check that `batch` fits the buffers exactly and every action is in range.
    pub fn validate(&self, batch: &TransitionBatch, num_actions: usize) -> Result<()> {
        let batch_size = self.batch_size();
        for (name, len) in [
            ("actions", batch.actions.len()),
            ("rewards", batch.rewards.len()),
            ("terminals", batch.terminals.len()),
        ] {
            if len != batch_size {
                return Err(QNetError::dimension_mismatch(
                    format!("{} {}", batch_size, name),
                    format!("{} {}", len, name),
                ));
            }
        }
        for (name, states) in [("states", &batch.states), ("next_states", &batch.next_states)] {
            if states.shape() != self.states.shape() {
                return Err(QNetError::dimension_mismatch(
                    format!("{} of shape {:?}", name, self.states.shape()),
                    format!("{} of shape {:?}", name, states.shape()),
                ));
            }
        }
        if let Some(&action) = batch.actions.iter().find(|&&a| a >= num_actions) {
            return Err(QNetError::InvalidAction {
                action,
                max_actions: num_actions,
            });
        }
        Ok(())
    }

    /// Overwrite the buffers with `batch`. Nothing is written unless the whole
    /// batch validates.
    pub fn bind(&mut self, batch: &TransitionBatch, num_actions: usize) -> Result<()> {
        self.validate(batch, num_actions)?;
        self.states.assign(&batch.states);
        self.next_states.assign(&batch.next_states);
        self.rewards.column_mut(0).assign(&batch.rewards);
        self.actions.column_mut(0).assign(&batch.actions);
        self.terminals
            .column_mut(0)
            .assign(&batch.terminals.mapv(|t| if t { 1.0 } else { 0.0 }));
        Ok(())
    }

    /// Zero the states buffer and place `state` in row 0.
    pub fn bind_single_state(&mut self, state: ArrayViewD<f32>) -> Result<()> {
        let row_shape = self.feature_shape().to_vec();
        if state.len() != row_shape.iter().product::<usize>()
            || state.broadcast(IxDyn(&row_shape)).is_none()
        {
            return Err(QNetError::dimension_mismatch(
                format!("{:?}", row_shape),
                format!("{:?}", state.shape()),
            ));
        }
        self.states.fill(0.0);
        place_state(&mut self.states, 0, state)
    }

    pub fn states(&self) -> ArrayViewD<'_, f32> {
        self.states.view()
    }

    pub fn next_states(&self) -> ArrayViewD<'_, f32> {
        self.next_states.view()
    }

    pub fn rewards(&self) -> ArrayView2<'_, f32> {
        self.rewards.view()
    }

    pub fn actions(&self) -> ArrayView2<'_, usize> {
        self.actions.view()
    }

    pub fn terminals(&self) -> ArrayView2<'_, f32> {
        self.terminals.view()
    }
}
