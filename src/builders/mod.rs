//! Function approximator builders. Each builder fixes an architecture and
//! produces independently initialised graphs of it.

pub mod dense;
pub mod conv;

pub use dense::{DenseBuilder, DenseGraph};
pub use conv::{ConvBuilder, ConvGraph};
