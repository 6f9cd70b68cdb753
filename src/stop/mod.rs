pub mod criterion;
pub mod evaluator;

pub use criterion::{Criterion, CriterionRole, Direction, TrainGoal};
pub use evaluator::{CriterionState, CriterionStatus, CriterionTracker, StoppingEvaluator};
