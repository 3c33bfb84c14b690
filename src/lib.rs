//! # qnetwork - Q-Value Function Approximation
//!
//! A parametric action-value estimator trained by temporal-difference
//! (Q-learning) updates, plus the small deterministic encoders that turn raw
//! observations into its feature vectors.
//!
//! ## Key Features
//!
//! - **Dual networks**: a live graph under training and a target graph frozen
//!   for a fixed number of updates to supply stable bootstrap targets
//! - **Robust loss**: Huber-style TD loss, quadratic up to an error of 1 and
//!   linear beyond, with L2 regularization of the weights
//! - **Update rules**: Adam, RMSProp and SGD with Nesterov momentum, selected by name
//! - **Two architectures**: fully connected over flat vectors, convolutional
//!   over single-channel grids, sharing one training implementation
//! - **Deterministic initialisation**: every random draw comes from a caller
//!   supplied or seeded generator
//!
//! ## Quick Start
//!
//! ```rust
//! use qnetwork::agent::{DenseQNetwork, QNetworkConfig};
//! use qnetwork::builders::DenseBuilder;
//! use qnetwork::encoders::{SingleRoomEncoder, StateEncoder};
//!
//! let encoder = SingleRoomEncoder::new(5);
//! let config = QNetworkConfig {
//!     batch_size: 32,
//!     num_actions: 4,
//!     discount: 0.99,
//!     learning_rate: 1e-3,
//!     regularization: 1e-4,
//!     update_rule: "adam".to_string(),
//!     freeze_interval: 1000,
//!     seed: Some(42),
//! };
//! let builder = DenseBuilder::new(encoder.output_len(), 2, 32);
//! let mut network = DenseQNetwork::new(builder, config).unwrap();
//!
//! let features = encoder.convert_state_to_agent_format((7, 3));
//! let q_values = network.get_q_values(features.view().into_dyn()).unwrap();
//! assert_eq!(q_values.len(), 4);
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (leaky rectifier, linear)
//! - [`agent`] - The dual-network Q estimator, its config and batch buffers
//! - [`builders`] - Dense and convolutional graph builders
//! - [`encoders`] - One-hot coordinate encoders
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense and convolutional layers, weight initialization
//! - [`loss`] - Huber TD loss
//! - [`network`] - Graph contract and Parameter Sets
//! - [`optimizer`] - Update rules

pub mod activations;
pub mod agent;
pub mod builders;
pub mod encoders;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizer;

#[cfg(test)]
mod tests;
