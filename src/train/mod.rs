pub mod loop_fn;
pub mod outcome;
pub mod record;
pub mod train_config;
pub mod trainer;

pub use loop_fn::train_loop;
pub use outcome::{Snapshot, Termination, TrainingOutcome};
pub use record::TrainingRecord;
pub use train_config::TrainConfig;
pub use trainer::Trainer;
