pub mod pattern_set;

pub use pattern_set::{ClassTargets, PatternClass, PatternSet};
