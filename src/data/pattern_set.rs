use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};

/// Class label of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternClass {
    Signal,
    Noise,
}

/// Network output each class is trained towards. The decision threshold
/// sweep runs from `noise` up to `signal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassTargets {
    pub signal: f64,
    pub noise: f64,
}

impl Default for ClassTargets {
    fn default() -> Self {
        ClassTargets { signal: 1.0, noise: 0.0 }
    }
}

impl ClassTargets {
    pub fn target(&self, class: PatternClass) -> f64 {
        match class {
            PatternClass::Signal => self.signal,
            PatternClass::Noise => self.noise,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.signal.is_finite() || !self.noise.is_finite() {
            return Err(TrainError::invalid("targets", "class targets must be finite"));
        }
        if self.signal <= self.noise {
            return Err(TrainError::invalid(
                "targets",
                format!("signal target {} must exceed noise target {}", self.signal, self.noise),
            ));
        }
        Ok(())
    }
}

/// Patterns of one dataset split by class. The crate never loads or
/// normalizes data; callers hand in ready-to-use input vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    pub signal: Vec<Vec<f64>>,
    pub noise: Vec<Vec<f64>>,
}

impl PatternSet {
    pub fn new(signal: Vec<Vec<f64>>, noise: Vec<Vec<f64>>) -> PatternSet {
        PatternSet { signal, noise }
    }

    pub fn from_labeled<I>(patterns: I) -> PatternSet
    where
        I: IntoIterator<Item = (Vec<f64>, PatternClass)>,
    {
        let mut set = PatternSet::default();
        for (input, class) in patterns {
            match class {
                PatternClass::Signal => set.signal.push(input),
                PatternClass::Noise => set.noise.push(input),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.signal.len() + self.noise.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal patterns first, then noise.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], PatternClass)> {
        self.signal.iter()
            .map(|p| (p.as_slice(), PatternClass::Signal))
            .chain(self.noise.iter().map(|p| (p.as_slice(), PatternClass::Noise)))
    }

    /// Checks that the set is usable with a network of `input_size` inputs.
    /// With `both_classes`, each class must hold at least one pattern.
    pub(crate) fn check(&self, set: &'static str, input_size: usize, both_classes: bool) -> Result<()> {
        if self.is_empty() {
            return Err(TrainError::EmptyDataset { set, reason: "no patterns".to_string() });
        }
        if both_classes && self.signal.is_empty() {
            return Err(TrainError::EmptyDataset { set, reason: "no signal patterns".to_string() });
        }
        if both_classes && self.noise.is_empty() {
            return Err(TrainError::EmptyDataset { set, reason: "no noise patterns".to_string() });
        }
        if let Some((input, _)) = self.iter().find(|(input, _)| input.len() != input_size) {
            return Err(TrainError::DimensionMismatch {
                context: format!("{set} pattern"),
                expected: input_size,
                actual: input.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_labeled_splits_by_class() {
        let set = PatternSet::from_labeled(vec![
            (vec![1.0], PatternClass::Signal),
            (vec![2.0], PatternClass::Noise),
            (vec![3.0], PatternClass::Signal),
        ]);
        assert_eq!(set.signal, vec![vec![1.0], vec![3.0]]);
        assert_eq!(set.noise, vec![vec![2.0]]);
        let classes: Vec<_> = set.iter().map(|(_, c)| c).collect();
        assert_eq!(classes, vec![PatternClass::Signal, PatternClass::Signal, PatternClass::Noise]);
    }

    #[test]
    fn targets_must_be_ordered() {
        assert!(ClassTargets::default().validate().is_ok());
        assert!(ClassTargets { signal: 1.0, noise: -1.0 }.validate().is_ok());
        assert!(ClassTargets { signal: 0.0, noise: 1.0 }.validate().is_err());
        assert_eq!(ClassTargets::default().target(PatternClass::Noise), 0.0);
    }

    #[test]
    fn check_reports_empty_and_mismatched_sets() {
        let empty = PatternSet::default();
        assert!(matches!(empty.check("training", 2, false), Err(TrainError::EmptyDataset { set: "training", .. })));

        let only_signal = PatternSet::new(vec![vec![0.0, 1.0]], vec![]);
        assert!(only_signal.check("training", 2, false).is_ok());
        assert!(matches!(only_signal.check("validation", 2, true), Err(TrainError::EmptyDataset { .. })));

        let ragged = PatternSet::new(vec![vec![0.0, 1.0]], vec![vec![0.0]]);
        assert!(matches!(
            ragged.check("test", 2, true),
            Err(TrainError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
