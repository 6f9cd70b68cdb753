use serde::{Serialize, Deserialize};
use std::fmt;

use crate::perf::evaluate::Evaluation;

/// Validation metric watched by a stopping criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Validation mean squared error.
    Mse,
    /// Validation SP index at its best operating point.
    Sp,
    /// Detection probability at the SP operating point.
    Detection,
    /// False-alarm rate at the SP operating point.
    FalseAlarm,
}

/// Which way a criterion's metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// Strict improvement; NaN never improves.
    pub fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            Direction::Minimize => candidate < best,
            Direction::Maximize => candidate > best,
        }
    }

    /// Value every candidate improves on.
    pub fn worst(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }
}

impl Criterion {
    pub fn direction(self) -> Direction {
        match self {
            Criterion::Mse | Criterion::FalseAlarm => Direction::Minimize,
            Criterion::Sp | Criterion::Detection => Direction::Maximize,
        }
    }

    pub fn metric(self, eval: &Evaluation) -> f64 {
        match self {
            Criterion::Mse => eval.mse,
            Criterion::Sp => eval.sp(),
            Criterion::Detection => eval.detection(),
            Criterion::FalseAlarm => eval.false_alarm(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Criterion::Mse => "mse",
            Criterion::Sp => "sp",
            Criterion::Detection => "detection",
            Criterion::FalseAlarm => "false_alarm",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a criterion does under a given goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionRole {
    pub criterion: Criterion,
    /// Training ends once every criterion with this flag has stopped.
    pub decides_stop: bool,
    /// The tracker holds a copy of the criterion's best network.
    pub keeps_snapshot: bool,
    /// The kept network is part of the returned snapshot list.
    pub returns_snapshot: bool,
    /// Stops no later than this criterion.
    pub follows: Option<Criterion>,
}

/// Whether a criterion's best network is discarded, kept for inspection
/// only, or kept and returned.
#[derive(Clone, Copy)]
enum Keep {
    Nothing,
    Internal,
    Returned,
}

const fn role(criterion: Criterion, decides_stop: bool, keep: Keep, follows: Option<Criterion>) -> CriterionRole {
    let (keeps_snapshot, returns_snapshot) = match keep {
        Keep::Nothing => (false, false),
        Keep::Internal => (true, false),
        Keep::Returned => (true, true),
    };
    CriterionRole { criterion, decides_stop, keeps_snapshot, returns_snapshot, follows }
}

const MSE_STOP_ROLES: &[CriterionRole] = &[
    role(Criterion::Mse, true, Keep::Returned, None),
    role(Criterion::Sp, false, Keep::Nothing, None),
];

const SP_STOP_ROLES: &[CriterionRole] = &[
    role(Criterion::Mse, false, Keep::Nothing, None),
    role(Criterion::Sp, true, Keep::Returned, None),
];

const MULTI_STOP_ROLES: &[CriterionRole] = &[
    role(Criterion::Mse, true, Keep::Internal, None),
    role(Criterion::Sp, true, Keep::Returned, None),
    role(Criterion::Detection, true, Keep::Returned, Some(Criterion::Sp)),
    role(Criterion::FalseAlarm, true, Keep::Returned, Some(Criterion::Sp)),
];

/// Training goal selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainGoal {
    /// Stop on validation MSE; returns the best-MSE network.
    MseStop,
    /// Stop on validation SP; returns the best-SP network.
    #[default]
    SpStop,
    /// Stop once MSE, SP, detection and false alarm have all stopped; returns
    /// the best networks by SP, detection and false alarm, in that order.
    MultiStop,
}

impl TrainGoal {
    /// Criterion table for this goal. Snapshots are returned in table order.
    pub fn roles(self) -> &'static [CriterionRole] {
        match self {
            TrainGoal::MseStop => MSE_STOP_ROLES,
            TrainGoal::SpStop => SP_STOP_ROLES,
            TrainGoal::MultiStop => MULTI_STOP_ROLES,
        }
    }
}
