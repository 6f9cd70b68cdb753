use serde::{Serialize, Deserialize};

use crate::stop::criterion::Criterion;
use crate::stop::evaluator::CriterionStatus;

/// Per-epoch training history entry.
///
/// One record is appended at the end of every completed epoch. When a
/// `progress_tx` channel is configured in `TrainConfig`, a copy is also sent
/// to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean squared error over this epoch's training batch.
    pub mse_trn: f64,
    pub mse_val: f64,
    pub sp_val: f64,
    /// Detection probability at the validation SP operating point.
    pub det_val: f64,
    /// False-alarm rate at the validation SP operating point.
    pub fa_val: f64,
    /// Test results, reported only; they never influence stopping.
    pub mse_tst: Option<f64>,
    pub sp_tst: Option<f64>,
    /// One entry per tracked criterion.
    pub criteria: Vec<CriterionStatus>,
    /// Wall-clock duration of this epoch in milliseconds.
    pub elapsed_ms: u64,
}

impl TrainingRecord {
    pub fn status(&self, criterion: Criterion) -> Option<&CriterionStatus> {
        self.criteria.iter().find(|s| s.criterion == criterion)
    }

    pub fn is_best(&self, criterion: Criterion) -> bool {
        self.status(criterion).is_some_and(|s| s.is_best)
    }

    pub fn num_fails(&self, criterion: Criterion) -> usize {
        self.status(criterion).map_or(0, |s| s.num_fails)
    }

    pub fn stop(&self, criterion: Criterion) -> bool {
        self.status(criterion).is_some_and(|s| s.stopped)
    }

    pub fn is_best_mse(&self) -> bool {
        self.is_best(Criterion::Mse)
    }

    pub fn is_best_sp(&self) -> bool {
        self.is_best(Criterion::Sp)
    }

    pub fn num_fails_mse(&self) -> usize {
        self.num_fails(Criterion::Mse)
    }

    pub fn num_fails_sp(&self) -> usize {
        self.num_fails(Criterion::Sp)
    }

    pub fn stop_mse(&self) -> bool {
        self.stop(Criterion::Mse)
    }

    pub fn stop_sp(&self) -> bool {
        self.stop(Criterion::Sp)
    }
}
