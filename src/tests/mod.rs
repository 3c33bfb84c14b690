// Test modules for all components
pub mod test_activations;
pub mod test_encoders;
pub mod test_gradients;
pub mod test_layers;
