use serde::{Serialize, Deserialize};

use crate::network::network::Network;
use crate::stop::criterion::Criterion;
use crate::train::record::TrainingRecord;

/// Independent copy of the best network found for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub criterion: Criterion,
    /// Epoch the copy was taken at; `None` when the criterion never improved
    /// and the snapshot is the initial network.
    pub epoch: Option<usize>,
    /// Metric value at that epoch.
    pub value: Option<f64>,
    pub network: Network,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Termination {
    /// The goal's stopping criteria all stopped at `epoch`.
    GoalReached { epoch: usize },
    /// The epoch budget ran out first.
    EpochBudget,
    /// Stop flag raised or progress receiver dropped; `epoch` is the last
    /// completed epoch.
    Cancelled { epoch: usize },
    /// Non-finite values appeared during `epoch`.
    Aborted { epoch: usize },
}

/// Result of a training run: best networks plus the full epoch history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// One to three snapshots, ordered as the goal's criterion table.
    pub snapshots: Vec<Snapshot>,
    /// Best networks of criteria the goal tracks without returning them
    /// (MSE under multi-stop).
    #[serde(default)]
    pub tracked: Vec<Snapshot>,
    pub history: Vec<TrainingRecord>,
    pub termination: Termination,
    /// `false` only for runs aborted on a numerical fault.
    pub complete: bool,
}

impl TrainingOutcome {
    pub fn snapshot(&self, criterion: Criterion) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.criterion == criterion)
    }

    /// Best network for `criterion`, whether returned or only tracked.
    pub fn best_network(&self, criterion: Criterion) -> Option<&Snapshot> {
        self.snapshot(criterion)
            .or_else(|| self.tracked.iter().find(|s| s.criterion == criterion))
    }

    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }

    pub fn last_record(&self) -> Option<&TrainingRecord> {
        self.history.last()
    }
}
