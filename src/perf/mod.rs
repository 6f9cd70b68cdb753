pub mod evaluate;
pub mod roc;
pub mod sp;

pub use evaluate::{evaluate, roc, Evaluation};
pub use roc::Roc;
pub use sp::{sp_index, OperatingPoint};
