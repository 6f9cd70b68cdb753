use serde::{Serialize, Deserialize};

/// SP index of a detection probability / false-alarm rate pair.
///
/// Square root of the product of the geometric and arithmetic means of the
/// detection probability and the specificity (`1 - false_alarm`). Lies in
/// [0, 1]; higher is better.
pub fn sp_index(detection: f64, false_alarm: f64) -> f64 {
    let specificity = 1.0 - false_alarm;
    let geometric = (detection * specificity).sqrt();
    let arithmetic = (detection + specificity) / 2.0;
    (geometric * arithmetic).sqrt()
}

/// One decision threshold and the efficiencies it yields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub cut: f64,
    pub sp: f64,
    pub detection: f64,
    pub false_alarm: f64,
}

impl OperatingPoint {
    pub fn new(cut: f64, detection: f64, false_alarm: f64) -> OperatingPoint {
        OperatingPoint { cut, sp: sp_index(detection, false_alarm), detection, false_alarm }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_and_useless_discriminators() {
        assert_eq!(sp_index(1.0, 0.0), 1.0);
        assert_eq!(sp_index(0.0, 0.0), 0.0);
        assert_eq!(sp_index(1.0, 1.0), 0.0);
    }

    #[test]
    fn matches_closed_form() {
        let (pd, fa) = (0.9, 0.2);
        let expected = ((pd * 0.8_f64).sqrt() * (pd + 0.8) / 2.0).sqrt();
        assert_relative_eq!(sp_index(pd, fa), expected, epsilon = 1e-15);
    }

    #[test]
    fn increases_with_detection_and_decreases_with_false_alarm() {
        assert!(sp_index(0.95, 0.1) > sp_index(0.9, 0.1));
        assert!(sp_index(0.9, 0.05) > sp_index(0.9, 0.1));
    }
}
