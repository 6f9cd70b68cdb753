pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod perf;
pub mod stop;
pub mod train;

// Convenience re-exports
pub use error::{ErrorKind, Result, TrainError};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::{simulate, Network};
pub use network::spec::{NetworkSpec, TrainingAlgorithm};
pub use optim::rprop::{Rprop, RpropParams};
pub use data::pattern_set::{ClassTargets, PatternClass, PatternSet};
pub use perf::{evaluate, roc, sp_index, Evaluation, OperatingPoint, Roc};
pub use stop::{Criterion, CriterionStatus, StoppingEvaluator, TrainGoal};
pub use train::{train_loop, Snapshot, Termination, TrainConfig, Trainer, TrainingOutcome, TrainingRecord};
