use serde::{Serialize, Deserialize};

use crate::data::pattern_set::{ClassTargets, PatternClass, PatternSet};
use crate::loss::mse::MseLoss;
use crate::network::network::Network;
use crate::perf::roc::Roc;
use crate::perf::sp::OperatingPoint;

/// Discrimination performance of a network on one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub mse: f64,
    /// Operating point of maximal SP.
    pub point: OperatingPoint,
}

impl Evaluation {
    pub fn sp(&self) -> f64 {
        self.point.sp
    }

    pub fn detection(&self) -> f64 {
        self.point.detection
    }

    pub fn false_alarm(&self) -> f64 {
        self.point.false_alarm
    }

    pub fn is_finite(&self) -> bool {
        self.mse.is_finite() && self.point.sp.is_finite()
    }
}

/// First output of the network for every pattern, split by class.
fn outputs(network: &Network, set: &PatternSet) -> (Vec<f64>, Vec<f64>) {
    let first = |p: &Vec<f64>| network.forward(p).first().copied().unwrap_or(f64::NAN);
    (set.signal.iter().map(first).collect(), set.noise.iter().map(first).collect())
}

/// ROC of `network` on `set`, swept from the noise target to the signal target.
pub fn roc(network: &Network, set: &PatternSet, targets: ClassTargets, roc_points: usize) -> Roc {
    let (signal, noise) = outputs(network, set);
    Roc::from_outputs(&signal, &noise, targets.noise, targets.signal, roc_points)
}

/// Mean squared error against the class targets plus the best SP operating
/// point. `set` must hold both classes and `roc_points >= 2`.
pub fn evaluate(network: &Network, set: &PatternSet, targets: ClassTargets, roc_points: usize) -> Evaluation {
    let (signal, noise) = outputs(network, set);

    let squared = |outs: &[f64], class: PatternClass| -> f64 {
        let target = [targets.target(class)];
        outs.iter().map(|&o| MseLoss::loss(&[o], &target)).sum()
    };
    let total = squared(&signal, PatternClass::Signal) + squared(&noise, PatternClass::Noise);
    let mse = total / set.len().max(1) as f64;

    let point = Roc::from_outputs(&signal, &noise, targets.noise, targets.signal, roc_points)
        .best()
        .unwrap_or(OperatingPoint { cut: f64::NAN, sp: f64::NAN, detection: f64::NAN, false_alarm: f64::NAN });

    Evaluation { mse, point }
}
