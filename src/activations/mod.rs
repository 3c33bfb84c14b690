//! # Activation Functions Module
//!
//! Non-linearities applied after a layer's affine transform.
//!
//! - **Linear**: identity, used by the Q-value output layer
//! - **LeakyRelu**: `x` for positive inputs, `alpha * x` otherwise; the hidden
//!   layers of both graph variants use it with `alpha = 0.01`
//! - **Relu**: the `alpha = 0` special case
//!
//! ```rust
//! use qnetwork::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![1.0, -0.5, 0.0, 2.0];
//! Activation::leaky_rectify().apply(&mut data);
//! assert_eq!(data, array![1.0f32, -0.005, 0.0, 2.0]);
//! ```

pub mod functions;

pub use functions::{Activation, DEFAULT_LEAKINESS};
