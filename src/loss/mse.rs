pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>() / n
    }

    /// Per-output gradient scaled by a class weight: weight · (predicted - expected)
    pub fn weighted_derivative(predicted: &[f64], expected: &[f64], weight: f64) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| weight * (a - b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_is_mean_squared_difference() {
        assert_eq!(MseLoss::loss(&[1.0, 0.0], &[0.0, 0.0]), 0.5);
        assert_eq!(MseLoss::loss(&[0.5], &[0.5]), 0.0);
    }

    #[test]
    fn derivative_scales_with_weight() {
        assert_eq!(MseLoss::weighted_derivative(&[0.75], &[1.0], 2.0), vec![-0.5]);
    }
}
