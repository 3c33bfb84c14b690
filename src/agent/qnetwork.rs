use log::{debug, info, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewD, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::batch::{TransitionBatch, TransitionBuffers};
use crate::agent::config::QNetworkConfig;
use crate::builders::{ConvBuilder, DenseBuilder};
use crate::error::Result;
use crate::loss::{HuberLoss, Loss};
use crate::network::{GraphBuilder, ParamSet, QGraph};
use crate::optimizer::{Optimizer, OptimizerWrapper, UpdateRule};

/// TD errors beyond this magnitude contribute linearly to the loss.
pub const TD_ERROR_CLIP: f32 = 1.0;

/// Q-learning estimator with a live graph under training and a frozen target
/// graph supplying bootstrap targets.
///
/// The target graph is overwritten with the live parameters before every
/// training call whose index is a multiple of `freeze_interval`, the first
/// call included, so it stays fixed for exactly `freeze_interval` calls.
///
/// # Example
///
/// ```rust
/// use qnetwork::agent::{DenseQNetwork, QNetworkConfig, Transition, TransitionBatch};
/// use qnetwork::builders::DenseBuilder;
/// use ndarray::{ArrayD, IxDyn};
///
/// let config = QNetworkConfig {
///     batch_size: 2,
///     num_actions: 3,
///     discount: 0.9,
///     learning_rate: 1e-3,
///     regularization: 1e-4,
///     update_rule: "adam".to_string(),
///     freeze_interval: 10,
///     seed: Some(7),
/// };
/// let mut network = DenseQNetwork::new(DenseBuilder::new(4, 1, 8), config).unwrap();
///
/// let state = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
/// let transition = Transition {
///     state: state.clone(),
///     action: 2,
///     reward: 1.0,
///     next_state: state.clone(),
///     terminal: true,
/// };
/// let batch = TransitionBatch::from_transitions(&[transition.clone(), transition], &[4]).unwrap();
/// let loss = network.train(&batch).unwrap();
/// assert!(loss.is_finite());
///
/// let q_values = network.get_q_values(state.view()).unwrap();
/// assert_eq!(q_values.len(), 3);
/// ```
pub struct QNetwork<B: GraphBuilder> {
    config: QNetworkConfig,
    update_rule: UpdateRule,
    builder: B,
    live: B::Graph,
    target: B::Graph,
    loss: HuberLoss,
    optimizer: OptimizerWrapper,
    buffers: TransitionBuffers,
    update_counter: usize,
    last_q_values: Option<Array2<f32>>,
}

/// Estimator over flat feature vectors with a sum-aggregated loss.
pub type DenseQNetwork = QNetwork<DenseBuilder>;

/// Estimator over single-channel grids with a mean-aggregated loss.
pub type ConvQNetwork = QNetwork<ConvBuilder>;

impl<B: GraphBuilder> QNetwork<B> {
    /// Create an estimator, seeding weight initialisation from `config.seed`
    /// or from entropy when no seed is given.
    pub fn new(builder: B, config: QNetworkConfig) -> Result<Self> {
        let update_rule = config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::assemble(builder, config, update_rule, &mut rng)
    }

    /// Create an estimator drawing its initial weights from `rng`.
    /// `config.seed` is ignored.
    pub fn with_rng<R: Rng + ?Sized>(builder: B, config: QNetworkConfig, rng: &mut R) -> Result<Self> {
        let update_rule = config.validate()?;
        Self::assemble(builder, config, update_rule, rng)
    }

    fn assemble<R: Rng + ?Sized>(
        builder: B,
        config: QNetworkConfig,
        update_rule: UpdateRule,
        rng: &mut R,
    ) -> Result<Self> {
        let live = builder.build(config.num_actions, config.batch_size, rng)?;
        let target = builder.build(config.num_actions, config.batch_size, rng)?;
        let optimizer = OptimizerWrapper::for_rule(update_rule, &live.param_set().shapes());
        let buffers = TransitionBuffers::new(config.batch_size, &builder.feature_shape());
        let loss = HuberLoss::new(TD_ERROR_CLIP, builder.aggregation());

        let mut network = QNetwork {
            config,
            update_rule,
            builder,
            live,
            target,
            loss,
            optimizer,
            buffers,
            update_counter: 0,
            last_q_values: None,
        };
        network.reset_target_network()?;

        info!(
            "Q network ready: features {:?}, {} actions, batch {}, {} update, target frozen for {} steps",
            network.buffers.feature_shape(),
            network.config.num_actions,
            network.config.batch_size,
            network.update_rule,
            network.config.freeze_interval
        );
        Ok(network)
    }

    /// Perform one Q-learning update on `batch` and return the loss measured
    /// before the update was applied.
    ///
    /// The batch must hold exactly `batch_size` transitions. A batch that does
    /// not fit is rejected before anything, the update counter included, changes.
    pub fn train(&mut self, batch: &TransitionBatch) -> Result<f32> {
        self.buffers.bind(batch, self.config.num_actions)?;

        if self.update_counter % self.config.freeze_interval == 0 {
            self.reset_target_network()?;
        }
        self.update_counter += 1;

        let q_values = self.live.forward(self.buffers.states())?;
        let next_q_values = self.target.predict(self.buffers.next_states())?;
        let targets = bootstrap_targets(
            self.buffers.rewards().column(0),
            self.buffers.terminals().column(0),
            next_q_values.view(),
            self.config.discount,
        );

        let actions = self.buffers.actions().column(0).to_owned();
        let taken = taken_action_values(q_values.view(), actions.view());
        let td_loss = self.loss.compute(taken.view(), targets.view());
        let loss = td_loss + self.config.regularization * self.live.l2_penalty();

        // Only the taken action's output receives gradient in each row.
        let row_gradients = self.loss.gradient(taken.view(), targets.view());
        let mut output_gradient = Array2::zeros(q_values.dim());
        for (i, (&action, &g)) in actions.iter().zip(row_gradients.iter()).enumerate() {
            output_gradient[[i, action]] = g;
        }

        let mut gradients = self.live.backward(output_gradient.view())?;
        let l2_scale = 2.0 * self.config.regularization;
        if l2_scale > 0.0 {
            for ((gradient, param), regularize) in gradients
                .iter_mut()
                .zip(self.live.params())
                .zip(self.live.regularizable())
            {
                if regularize {
                    gradient.scaled_add(l2_scale, &param);
                }
            }
        }

        let mut params = self.live.params_mut();
        self.optimizer.step(&mut params, &gradients, self.config.learning_rate)?;

        trace!(
            "train step {}: loss {:.6} (td {:.6})",
            self.update_counter,
            loss,
            td_loss
        );
        self.last_q_values = Some(q_values);
        Ok(loss)
    }

    /// Q-value estimates of the live graph for a single encoded state.
    ///
    /// The state is placed in row 0 of an otherwise zeroed batch; the other
    /// rows' outputs are discarded.
    pub fn get_q_values(&mut self, state: ArrayViewD<f32>) -> Result<Array1<f32>> {
        self.buffers.bind_single_state(state)?;
        let q_values = self.live.predict(self.buffers.states())?;
        Ok(q_values.index_axis_move(Axis(0), 0))
    }

    /// Copy of the live parameters.
    pub fn get_params(&self) -> ParamSet {
        self.live.param_set()
    }

    /// Replace the live parameters and synchronise the target graph with them.
    /// On a shape mismatch neither graph changes.
    pub fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        self.live.load_params(params)?;
        debug!("loaded {} parameter arrays into the live graph", params.len());
        self.reset_target_network()
    }

    /// Copy of the target parameters.
    pub fn target_params(&self) -> ParamSet {
        self.target.param_set()
    }

    /// Overwrite the target graph with the live parameters.
    pub fn reset_target_network(&mut self) -> Result<()> {
        let params = self.live.param_set();
        self.target.load_params(&params)?;
        debug!("target network synchronised at update {}", self.update_counter);
        Ok(())
    }

    /// Hook for the training loop at episode boundaries; the estimator keeps no
    /// per-episode state.
    pub fn finish_episode(&mut self) {}

    /// Number of training calls made so far.
    pub fn update_counter(&self) -> usize {
        self.update_counter
    }

    /// Live Q-values of the most recent training batch.
    pub fn last_q_values(&self) -> Option<ArrayView2<'_, f32>> {
        self.last_q_values.as_ref().map(|q| q.view())
    }

    pub fn config(&self) -> &QNetworkConfig {
        &self.config
    }

    pub fn update_rule(&self) -> UpdateRule {
        self.update_rule
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// The graph being trained.
    pub fn live_graph(&self) -> &B::Graph {
        &self.live
    }
}

/// `reward + discount * max_a next_q[a]` per row, with the future term dropped
/// entirely where the terminal mask is set.
pub fn bootstrap_targets(
    rewards: ArrayView1<f32>,
    terminals: ArrayView1<f32>,
    next_q_values: ArrayView2<f32>,
    discount: f32,
) -> Array1<f32> {
    rewards
        .iter()
        .zip(terminals.iter())
        .zip(next_q_values.outer_iter())
        .map(|((&reward, &terminal), next_q)| {
            if terminal != 0.0 {
                reward
            } else {
                // NaN propagates so a diverged target shows up in the loss.
                let best = next_q
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, |acc, q| if q.is_nan() || q > acc { q } else { acc });
                reward + discount * best
            }
        })
        .collect()
}

/// `q_values[i, actions[i]]` for every row.
pub fn taken_action_values(q_values: ArrayView2<f32>, actions: ArrayView1<usize>) -> Array1<f32> {
    actions
        .iter()
        .enumerate()
        .map(|(i, &action)| q_values[[i, action]])
        .collect()
}

impl<B: GraphBuilder> std::fmt::Debug for QNetwork<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QNetwork")
            .field("config", &self.config)
            .field("update_counter", &self.update_counter)
            .finish()
    }
}
