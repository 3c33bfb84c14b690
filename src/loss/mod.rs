//! Loss functions for temporal-difference training.

pub mod functions;

pub use functions::{Aggregation, HuberLoss, Loss};
