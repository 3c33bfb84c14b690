pub mod traits;
pub mod dense;
pub mod conv;
pub mod initialization;

pub use traits::Layer as LayerTrait;
pub use dense::DenseLayer;
pub use conv::Conv2DLayer;
pub use initialization::{FanIn, WeightInit};
