pub mod gradients;
pub mod rprop;

pub use gradients::{Gradients, LayerGradients};
pub use rprop::{ParamState, Rprop, RpropParams};
