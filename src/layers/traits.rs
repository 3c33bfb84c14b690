use ndarray::{ArrayViewD, ArrayViewMutD};

/// Trait defining the parameter interface shared by trainable layers.
///
/// Parameters are always reported weights first, then biases.
pub trait Layer: Send + Sync {
    /// Read-only views of the layer's parameters.
    fn params(&self) -> Vec<ArrayViewD<'_, f32>>;

    /// Mutable views of the layer's parameters, in the same order as [`Layer::params`].
    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>>;

    /// Whether each parameter takes part in L2 regularization.
    fn regularizable(&self) -> Vec<bool> {
        vec![true, false]
    }

    /// Get the number of outputs the layer produces for one sample
    fn output_size(&self) -> usize;
}
