pub mod network;
pub mod spec;

pub use network::{simulate, Network};
pub use spec::{NetworkSpec, TrainingAlgorithm};
