//! Per-criterion stopping state machines.
//!
//! Every criterion of the goal's table gets a [`CriterionTracker`]. A tracker
//! starts `Active`; each epoch it either records a strict improvement (fail
//! counter reset, best network replaced) or counts a failure. Reaching
//! `max_fail` consecutive failures moves it to the terminal `Stopped` state,
//! after which its best network is never touched again.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::network::network::Network;
use crate::perf::evaluate::Evaluation;
use crate::stop::criterion::{Criterion, CriterionRole, TrainGoal};
use crate::train::outcome::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionState {
    Active,
    Stopped,
}

/// Outcome of one criterion for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionStatus {
    pub criterion: Criterion,
    /// Metric value observed this epoch.
    pub value: f64,
    /// This epoch improved on every earlier one.
    pub is_best: bool,
    /// Consecutive epochs without improvement.
    pub num_fails: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone)]
pub struct CriterionTracker {
    role: CriterionRole,
    max_fail: usize,
    best_value: f64,
    best_epoch: Option<usize>,
    num_fails: usize,
    state: CriterionState,
    snapshot: Option<Network>,
}

impl CriterionTracker {
    fn new(role: CriterionRole, max_fail: usize, initial: &Network) -> CriterionTracker {
        CriterionTracker {
            role,
            max_fail,
            best_value: role.criterion.direction().worst(),
            best_epoch: None,
            num_fails: 0,
            state: CriterionState::Active,
            snapshot: role.keeps_snapshot.then(|| initial.clone()),
        }
    }

    pub fn criterion(&self) -> Criterion {
        self.role.criterion
    }

    pub fn role(&self) -> &CriterionRole {
        &self.role
    }

    pub fn state(&self) -> CriterionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == CriterionState::Stopped
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_epoch.map(|_| self.best_value)
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn num_fails(&self) -> usize {
        self.num_fails
    }

    pub fn snapshot(&self) -> Option<&Network> {
        self.snapshot.as_ref()
    }

    fn status(&self, value: f64, is_best: bool) -> CriterionStatus {
        CriterionStatus {
            criterion: self.role.criterion,
            value,
            is_best,
            num_fails: self.num_fails,
            stopped: self.is_stopped(),
        }
    }

    fn observe(&mut self, epoch: usize, value: f64, network: &Network) -> CriterionStatus {
        if self.is_stopped() {
            return self.status(value, false);
        }

        let improved = self.role.criterion.direction().improves(value, self.best_value);
        if improved {
            self.best_value = value;
            self.best_epoch = Some(epoch);
            self.num_fails = 0;
            if self.role.keeps_snapshot {
                self.snapshot = Some(network.clone());
            }
            debug!(epoch, criterion = %self.role.criterion, value, "new best");
        } else {
            self.num_fails += 1;
            if self.num_fails >= self.max_fail {
                self.state = CriterionState::Stopped;
                info!(
                    epoch,
                    criterion = %self.role.criterion,
                    best_epoch = ?self.best_epoch,
                    "criterion stopped after {} epochs without improvement",
                    self.num_fails
                );
            }
        }
        self.status(value, improved)
    }

    fn stop(&mut self, epoch: usize, leader: Criterion) {
        if !self.is_stopped() {
            self.state = CriterionState::Stopped;
            info!(epoch, criterion = %self.role.criterion, %leader, "criterion stopped with its leader");
        }
    }

    fn to_snapshot(&self) -> Option<Snapshot> {
        let network = self.snapshot.clone()?;
        Some(Snapshot {
            criterion: self.role.criterion,
            epoch: self.best_epoch,
            value: self.best_value(),
            network,
        })
    }
}

/// Table-driven set of criterion trackers for one training goal.
#[derive(Debug, Clone)]
pub struct StoppingEvaluator {
    goal: TrainGoal,
    trackers: Vec<CriterionTracker>,
}

impl StoppingEvaluator {
    /// Creates one tracker per criterion of `goal`. Snapshot-keeping trackers
    /// start out holding a copy of `initial`.
    pub fn new(goal: TrainGoal, max_fail: usize, initial: &Network) -> StoppingEvaluator {
        let trackers = goal.roles().iter()
            .map(|&role| CriterionTracker::new(role, max_fail, initial))
            .collect();
        StoppingEvaluator { goal, trackers }
    }

    /// Overrides the patience of one criterion. No effect if the goal does
    /// not track it.
    pub fn with_max_fail(mut self, criterion: Criterion, max_fail: usize) -> StoppingEvaluator {
        if let Some(t) = self.trackers.iter_mut().find(|t| t.criterion() == criterion) {
            t.max_fail = max_fail;
        }
        self
    }

    pub fn goal(&self) -> TrainGoal {
        self.goal
    }

    pub fn trackers(&self) -> &[CriterionTracker] {
        &self.trackers
    }

    pub fn tracker(&self, criterion: Criterion) -> Option<&CriterionTracker> {
        self.trackers.iter().find(|t| t.criterion() == criterion)
    }

    fn is_stopped(&self, criterion: Criterion) -> bool {
        self.tracker(criterion).is_some_and(CriterionTracker::is_stopped)
    }

    /// Feeds one epoch's validation results to every tracker. Returns one
    /// status per tracker, in table order.
    pub fn evaluate(&mut self, epoch: usize, eval: &Evaluation, network: &Network) -> Vec<CriterionStatus> {
        let mut statuses: Vec<Option<CriterionStatus>> = vec![None; self.trackers.len()];

        for (i, tracker) in self.trackers.iter_mut().enumerate() {
            if tracker.role.follows.is_none() {
                let value = tracker.criterion().metric(eval);
                statuses[i] = Some(tracker.observe(epoch, value, network));
            }
        }

        for i in 0..self.trackers.len() {
            let Some(leader) = self.trackers[i].role.follows else { continue };
            if self.is_stopped(leader) {
                self.trackers[i].stop(epoch, leader);
            }
            let tracker = &mut self.trackers[i];
            let value = tracker.criterion().metric(eval);
            statuses[i] = Some(tracker.observe(epoch, value, network));
        }

        statuses.into_iter().flatten().collect()
    }

    /// True once every criterion that decides termination has stopped.
    pub fn should_stop(&self) -> bool {
        self.trackers.iter()
            .filter(|t| t.role.decides_stop)
            .all(CriterionTracker::is_stopped)
    }

    /// Copies of the best networks the goal returns, in table order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.trackers.iter()
            .filter(|t| t.role.returns_snapshot)
            .filter_map(CriterionTracker::to_snapshot)
            .collect()
    }

    /// Best networks of criteria that are tracked but not returned, such as
    /// MSE under multi-stop.
    pub fn tracked_snapshots(&self) -> Vec<Snapshot> {
        self.trackers.iter()
            .filter(|t| !t.role.returns_snapshot)
            .filter_map(CriterionTracker::to_snapshot)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::sp::OperatingPoint;
    use rand::{rngs::StdRng, SeedableRng};

    fn net() -> Network {
        Network::from_identifiers(&[2, 1], &["tansig"], &mut StdRng::seed_from_u64(9)).unwrap()
    }

    /// Network whose single bias encodes the epoch it came from.
    fn tagged(epoch: usize) -> Network {
        let mut n = net();
        n.layers[0].biases[0] = epoch as f64;
        n
    }

    fn eval(mse: f64, detection: f64, false_alarm: f64) -> Evaluation {
        Evaluation { mse, point: OperatingPoint::new(0.5, detection, false_alarm) }
    }

    fn status(statuses: &[CriterionStatus], c: Criterion) -> CriterionStatus {
        *statuses.iter().find(|s| s.criterion == c).unwrap()
    }

    #[test]
    fn mse_stops_after_two_failures_under_multi_stop() {
        let mut ev = StoppingEvaluator::new(TrainGoal::MultiStop, 2, &net());
        let mses = [0.5, 0.5, 0.6, 0.7];
        let mut stopped_at = None;
        for (i, &mse) in mses.iter().enumerate() {
            let epoch = i + 1;
            let statuses = ev.evaluate(epoch, &eval(mse, 0.9, 0.1), &tagged(epoch));
            let s = status(&statuses, Criterion::Mse);
            if s.stopped && stopped_at.is_none() {
                stopped_at = Some(epoch);
            }
            if epoch == 1 {
                assert!(s.is_best);
            }
        }
        assert_eq!(stopped_at, Some(3));
        let mse = ev.tracker(Criterion::Mse).unwrap();
        assert_eq!(mse.best_epoch(), Some(1));
        assert_eq!(mse.best_value(), Some(0.5));
        assert_eq!(mse.num_fails(), 2);
        assert_eq!(mse.snapshot(), Some(&tagged(1)));
        // Kept for inspection, not part of the multi-stop result.
        assert!(ev.snapshots().iter().all(|s| s.criterion != Criterion::Mse));
        let tracked = ev.tracked_snapshots();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].criterion, Criterion::Mse);
        assert_eq!(tracked[0].epoch, Some(1));
        assert_eq!(tracked[0].network, tagged(1));
    }

    #[test]
    fn snapshot_is_the_network_of_the_best_epoch() {
        let mut ev = StoppingEvaluator::new(TrainGoal::MseStop, 2, &net());
        for (i, &mse) in [0.5, 0.5, 0.6, 0.7].iter().enumerate() {
            ev.evaluate(i + 1, &eval(mse, 0.9, 0.1), &tagged(i + 1));
        }
        assert!(ev.should_stop());
        let snaps = ev.snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].criterion, Criterion::Mse);
        assert_eq!(snaps[0].epoch, Some(1));
        assert_eq!(snaps[0].network, tagged(1));
    }

    #[test]
    fn stopped_criterion_ignores_later_improvements() {
        let mut ev = StoppingEvaluator::new(TrainGoal::MseStop, 1, &net());
        ev.evaluate(1, &eval(0.5, 0.9, 0.1), &tagged(1));
        let statuses = ev.evaluate(2, &eval(0.6, 0.9, 0.1), &tagged(2));
        assert!(status(&statuses, Criterion::Mse).stopped);

        let statuses = ev.evaluate(3, &eval(0.1, 0.9, 0.1), &tagged(3));
        let s = status(&statuses, Criterion::Mse);
        assert!(!s.is_best);
        assert!(s.stopped);
        assert_eq!(ev.snapshots()[0].network, tagged(1));
    }

    #[test]
    fn counters_reset_on_improvement() {
        let mut ev = StoppingEvaluator::new(TrainGoal::SpStop, 5, &net());
        ev.evaluate(1, &eval(0.5, 0.8, 0.2), &tagged(1));
        let s = ev.evaluate(2, &eval(0.5, 0.7, 0.2), &tagged(2));
        assert_eq!(status(&s, Criterion::Sp).num_fails, 1);
        let s = ev.evaluate(3, &eval(0.5, 0.9, 0.2), &tagged(3));
        let sp = status(&s, Criterion::Sp);
        assert!(sp.is_best);
        assert_eq!(sp.num_fails, 0);
    }

    #[test]
    fn followers_stop_with_sp_and_keep_their_own_best() {
        let mut ev = StoppingEvaluator::new(TrainGoal::MultiStop, 2, &net())
            .with_max_fail(Criterion::Detection, 100)
            .with_max_fail(Criterion::FalseAlarm, 100);
        // SP falls from epoch 2 on, detection keeps rising until SP stops.
        let points = [(0.80, 0.10), (0.85, 0.30), (0.90, 0.50), (0.95, 0.60)];
        for (i, &(pd, fa)) in points.iter().enumerate() {
            ev.evaluate(i + 1, &eval(0.1 / (i + 1) as f64, pd, fa), &tagged(i + 1));
        }
        assert!(ev.tracker(Criterion::Sp).unwrap().is_stopped());
        let det = ev.tracker(Criterion::Detection).unwrap();
        assert!(det.is_stopped());
        assert_eq!(det.best_epoch(), Some(2));
        assert_eq!(ev.tracker(Criterion::FalseAlarm).unwrap().best_epoch(), Some(1));

        let snaps = ev.snapshots();
        let order: Vec<_> = snaps.iter().map(|s| s.criterion).collect();
        assert_eq!(order, vec![Criterion::Sp, Criterion::Detection, Criterion::FalseAlarm]);
        assert_eq!(snaps[1].network, tagged(2));
        // MSE is still improving, so the run goes on.
        assert!(!ev.should_stop());
    }

    #[test]
    fn snapshots_start_as_the_initial_network() {
        let initial = tagged(0);
        let ev = StoppingEvaluator::new(TrainGoal::MultiStop, 3, &initial);
        let snaps = ev.snapshots();
        assert_eq!(snaps.len(), 3);
        assert!(snaps.iter().all(|s| s.network == initial && s.epoch.is_none() && s.value.is_none()));
    }
}
