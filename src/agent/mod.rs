//! # Q-Value Estimation Module
//!
//! A Q-learning estimator built from two graphs of the same architecture:
//!
//! - **Live graph**: trained on every call to `train`, answers inference
//! - **Target graph**: a frozen copy of the live parameters that supplies the
//!   bootstrap term `max_a Q(s', a)`, refreshed every `freeze_interval` calls
//!
//! Each training step computes, per transition,
//! `target = reward + (1 - terminal) * discount * max_a Q_target(s', a)` and the
//! TD error `target - Q_live(s, a_taken)`, passes it through a Huber loss
//! clipped at 1, adds an L2 penalty on the live weights and applies the
//! configured update rule (`adam`, `rmsprop` or `sgd` with Nesterov momentum).
//!
//! Inputs are bound into pre-allocated buffers of fixed batch size; single
//! state inference pads the batch with zero rows.
//!
//! ```rust,no_run
//! use qnetwork::agent::{ConvQNetwork, QNetworkConfig};
//! use qnetwork::builders::ConvBuilder;
//!
//! let config = QNetworkConfig::load("qnetwork.json").unwrap();
//! let network = ConvQNetwork::new(ConvBuilder::new((6, 6), 16), config).unwrap();
//! assert_eq!(network.update_counter(), 0);
//! ```

pub mod batch;
pub mod config;
pub mod qnetwork;
pub mod traits;

pub use batch::{Transition, TransitionBatch, TransitionBuffers};
pub use config::QNetworkConfig;
pub use qnetwork::{bootstrap_targets, taken_action_values, ConvQNetwork, DenseQNetwork, QNetwork, TD_ERROR_CLIP};
pub use traits::ValueEstimator;
