use serde::{Serialize, Deserialize};

use crate::perf::sp::{sp_index, OperatingPoint};

/// Receiver operating characteristic sampled on a uniform threshold grid.
///
/// For each cut, `detection` is the fraction of signal outputs `>= cut` and
/// `false_alarm` the fraction of noise outputs `>= cut`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roc {
    pub cut: Vec<f64>,
    pub sp: Vec<f64>,
    pub detection: Vec<f64>,
    pub false_alarm: Vec<f64>,
}

impl Roc {
    /// Sweeps `num_points - 1` cuts starting at `low` with step
    /// `(high - low) / num_points`.
    pub fn from_outputs(signal: &[f64], noise: &[f64], low: f64, high: f64, num_points: usize) -> Roc {
        let signal = sorted(signal);
        let noise = sorted(noise);
        let step = (high - low) / num_points as f64;

        let mut roc = Roc::default();
        for i in 0..num_points.saturating_sub(1) {
            let cut = low + i as f64 * step;
            let detection = fraction_at_or_above(&signal, cut);
            let false_alarm = fraction_at_or_above(&noise, cut);
            roc.cut.push(cut);
            roc.detection.push(detection);
            roc.false_alarm.push(false_alarm);
            roc.sp.push(sp_index(detection, false_alarm));
        }
        roc
    }

    pub fn len(&self) -> usize {
        self.cut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cut.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<OperatingPoint> {
        Some(OperatingPoint {
            cut: *self.cut.get(index)?,
            sp: self.sp[index],
            detection: self.detection[index],
            false_alarm: self.false_alarm[index],
        })
    }

    /// Operating point of maximal SP; the lowest cut wins ties.
    pub fn best(&self) -> Option<OperatingPoint> {
        let mut best: Option<usize> = None;
        for (i, &sp) in self.sp.iter().enumerate() {
            if best.map_or(true, |b| sp > self.sp[b]) {
                best = Some(i);
            }
        }
        self.point(best?)
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

fn fraction_at_or_above(sorted: &[f64], cut: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let below = sorted.partition_point(|&x| x < cut);
    (sorted.len() - below) as f64 / sorted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_spans_range_without_the_last_point() {
        let roc = Roc::from_outputs(&[0.9], &[0.1], -1.0, 1.0, 4);
        assert_eq!(roc.cut, vec![-1.0, -0.5, 0.0]);
    }

    #[test]
    fn separable_outputs_reach_perfect_sp() {
        let roc = Roc::from_outputs(&[0.8, 0.9, 0.95], &[0.05, 0.1, 0.3], 0.0, 1.0, 100);
        let best = roc.best().unwrap();
        assert_eq!(best.sp, 1.0);
        assert_eq!(best.detection, 1.0);
        assert_eq!(best.false_alarm, 0.0);
        assert!(best.cut > 0.3 && best.cut <= 0.8);
    }

    #[test]
    fn efficiencies_count_outputs_at_or_above_cut() {
        let roc = Roc::from_outputs(&[0.2, 0.65, 0.65, 0.9], &[0.1, 0.65], 0.0, 1.0, 10);
        let idx = 6;
        assert_relative_eq!(roc.cut[idx], 0.6, epsilon = 1e-12);
        assert_relative_eq!(roc.detection[idx], 0.75);
        assert_relative_eq!(roc.false_alarm[idx], 0.5);
        assert_relative_eq!(roc.sp[idx], sp_index(0.75, 0.5));
    }

    #[test]
    fn empty_grid_has_no_best_point() {
        let roc = Roc::from_outputs(&[0.5], &[0.5], 0.0, 1.0, 1);
        assert!(roc.is_empty());
        assert!(roc.best().is_none());
    }
}
