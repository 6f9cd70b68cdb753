//! Resilient backpropagation.
//!
//! Each parameter carries its own step size, adapted only from the sign of
//! successive epoch gradients:
//!
//! - same sign as last epoch (or no previous sign): step grows by `inc_eta`,
//!   capped at `delta_max`, and the parameter moves by `-sign · step`;
//! - opposite sign: step shrinks by `dec_eta`, floored at `delta_min`, and
//!   the parameter does not move this epoch;
//! - zero gradient: step and parameter are left alone.

use serde::{Serialize, Deserialize};

use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::optim::gradients::{Gradients, LayerGradients};

/// Step-size schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpropParams {
    /// Initial step size of every parameter.
    pub init_eta: f64,
    /// Growth factor on sign agreement (> 1).
    pub inc_eta: f64,
    /// Shrink factor on sign change (in (0, 1)).
    pub dec_eta: f64,
    pub delta_min: f64,
    pub delta_max: f64,
}

impl Default for RpropParams {
    fn default() -> Self {
        RpropParams {
            init_eta: 0.1,
            inc_eta: 1.1,
            dec_eta: 0.5,
            delta_min: 1e-6,
            delta_max: 50.0,
        }
    }
}

impl RpropParams {
    pub fn validate(&self) -> Result<()> {
        let finite_positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(TrainError::invalid(name, format!("must be a finite positive number, got {v}")))
            }
        };
        finite_positive("init_eta", self.init_eta)?;
        finite_positive("inc_eta", self.inc_eta)?;
        finite_positive("dec_eta", self.dec_eta)?;
        finite_positive("delta_min", self.delta_min)?;
        finite_positive("delta_max", self.delta_max)?;

        if self.inc_eta <= 1.0 {
            return Err(TrainError::invalid("inc_eta", format!("must be greater than 1, got {}", self.inc_eta)));
        }
        if self.dec_eta >= 1.0 {
            return Err(TrainError::invalid("dec_eta", format!("must be less than 1, got {}", self.dec_eta)));
        }
        if self.delta_min > self.delta_max {
            return Err(TrainError::invalid(
                "delta_min",
                format!("{} exceeds delta_max {}", self.delta_min, self.delta_max),
            ));
        }
        if self.init_eta < self.delta_min || self.init_eta > self.delta_max {
            return Err(TrainError::invalid(
                "init_eta",
                format!("{} is outside [delta_min, delta_max] = [{}, {}]", self.init_eta, self.delta_min, self.delta_max),
            ));
        }
        Ok(())
    }
}

/// Adaptive state of a single weight or bias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamState {
    pub step: f64,
    /// Sign of the previous epoch's gradient; 0 before the first epoch.
    pub prev_sign: f64,
}

impl ParamState {
    fn new(step: f64) -> ParamState {
        ParamState { step, prev_sign: 0.0 }
    }

    /// Advances the state with this epoch's gradient and returns the
    /// parameter delta.
    pub fn update(&mut self, gradient: f64, params: &RpropParams) -> f64 {
        let s = sign(gradient);
        if s == 0.0 {
            self.prev_sign = 0.0;
            return 0.0;
        }

        let delta = if self.prev_sign * s < 0.0 {
            self.step = (self.step * params.dec_eta).max(params.delta_min);
            0.0
        } else {
            self.step = (self.step * params.inc_eta).min(params.delta_max);
            -s * self.step
        };
        self.prev_sign = s;
        delta
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Per-layer side structure, indexed like the layer's weights and biases.
#[derive(Debug, Clone)]
struct LayerState {
    weights: Vec<Vec<ParamState>>,
    biases: Vec<ParamState>,
}

/// The gradient updater. Owns one [`ParamState`] per network parameter for
/// the lifetime of one training run.
#[derive(Debug, Clone)]
pub struct Rprop {
    params: RpropParams,
    layers: Vec<LayerState>,
}

impl Rprop {
    pub fn new(params: RpropParams, network: &Network) -> Rprop {
        let layers = network.layers.iter()
            .map(|layer| LayerState {
                weights: vec![vec![ParamState::new(params.init_eta); layer.weights.cols]; layer.weights.rows],
                biases: vec![ParamState::new(params.init_eta); layer.size],
            })
            .collect();
        Rprop { params, layers }
    }

    pub fn params(&self) -> &RpropParams {
        &self.params
    }

    /// Turns one epoch's accumulated gradients into parameter deltas.
    ///
    /// Deltas are produced for frozen nodes as well; the network drops them
    /// when they are applied.
    pub fn step(&mut self, gradients: &Gradients) -> Result<Vec<LayerGradients>> {
        if gradients.layers.len() != self.layers.len() {
            return Err(TrainError::DimensionMismatch {
                context: "gradient layers".to_string(),
                expected: self.layers.len(),
                actual: gradients.layers.len(),
            });
        }

        let params = self.params;
        let mut deltas = Vec::with_capacity(self.layers.len());
        for (state, grad) in self.layers.iter_mut().zip(gradients.layers.iter()) {
            if grad.weights.rows != state.weights.len()
                || grad.biases.len() != state.biases.len()
                || state.weights.first().is_some_and(|row| row.len() != grad.weights.cols)
            {
                return Err(TrainError::DimensionMismatch {
                    context: "gradient shape".to_string(),
                    expected: state.biases.len(),
                    actual: grad.biases.len(),
                });
            }

            let weights: Vec<Vec<f64>> = state.weights.iter_mut()
                .zip(grad.weights.data.iter())
                .map(|(row_state, row_grad)| {
                    row_state.iter_mut()
                        .zip(row_grad.iter())
                        .map(|(p, &g)| p.update(g, &params))
                        .collect()
                })
                .collect();
            let biases: Vec<f64> = state.biases.iter_mut()
                .zip(grad.biases.iter())
                .map(|(p, &g)| p.update(g, &params))
                .collect();

            deltas.push(LayerGradients { weights: Matrix::from_data(weights), biases });
        }
        Ok(deltas)
    }

    /// Current step size of weight `(row, col)` in `layer`.
    pub fn weight_step(&self, layer: usize, row: usize, col: usize) -> Option<f64> {
        self.layers.get(layer)?.weights.get(row)?.get(col).map(|p| p.step)
    }

    pub fn bias_step(&self, layer: usize, node: usize) -> Option<f64> {
        self.layers.get(layer)?.biases.get(node).map(|p| p.step)
    }

    /// Every step size currently held, weights first then biases per layer.
    pub fn step_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.layers.iter().flat_map(|l| {
            l.weights.iter().flatten().chain(l.biases.iter()).map(|p| p.step)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn params() -> RpropParams {
        RpropParams { init_eta: 0.1, inc_eta: 1.2, dec_eta: 0.5, delta_min: 1e-3, delta_max: 0.5 }
    }

    #[test]
    fn first_epoch_counts_as_agreement() {
        let p = params();
        let mut s = ParamState::new(p.init_eta);
        let delta = s.update(3.0, &p);
        assert_relative_eq!(s.step, 0.12, epsilon = 1e-12);
        assert_relative_eq!(delta, -0.12, epsilon = 1e-12);
    }

    #[test]
    fn same_sign_grows_opposite_sign_shrinks_and_skips() {
        let p = params();
        let mut s = ParamState::new(p.init_eta);
        s.update(-1.0, &p);
        let before = s.step;
        let delta = s.update(-0.001, &p);
        assert!(s.step > before);
        assert!(delta > 0.0);

        let before = s.step;
        let delta = s.update(5.0, &p);
        assert!(s.step < before);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn zero_gradient_leaves_step_unchanged() {
        let p = params();
        let mut s = ParamState::new(p.init_eta);
        s.update(1.0, &p);
        let before = s.step;
        assert_eq!(s.update(0.0, &p), 0.0);
        assert_eq!(s.step, before);
    }

    #[test]
    fn step_stays_within_bounds_for_any_sign_sequence() {
        let p = params();
        let mut rng = StdRng::seed_from_u64(11);
        let mut s = ParamState::new(p.init_eta);
        for _ in 0..500 {
            let g: f64 = match rng.gen_range(0..5) {
                0 => 0.0,
                1 | 2 => rng.gen_range(0.001..10.0),
                _ => -rng.gen_range(0.001..10.0),
            };
            s.update(g, &p);
            assert!(s.step >= p.delta_min && s.step <= p.delta_max, "step {} escaped", s.step);
        }
        let mut s = ParamState::new(p.init_eta);
        for _ in 0..100 {
            s.update(1.0, &p);
        }
        assert_eq!(s.step, p.delta_max);
        for i in 0..100 {
            s.update(if i % 2 == 0 { -1.0 } else { 1.0 }, &p);
        }
        assert_eq!(s.step, p.delta_min);
    }

    #[test]
    fn validate_rejects_inconsistent_bounds() {
        assert!(RpropParams::default().validate().is_ok());
        let err = RpropParams { inc_eta: 1.0, ..Default::default() }.validate().unwrap_err();
        assert!(matches!(err, TrainError::InvalidParameter { parameter: "inc_eta", .. }));
        let err = RpropParams { dec_eta: 1.5, ..Default::default() }.validate().unwrap_err();
        assert!(matches!(err, TrainError::InvalidParameter { parameter: "dec_eta", .. }));
        let err = RpropParams { init_eta: 100.0, ..Default::default() }.validate().unwrap_err();
        assert!(matches!(err, TrainError::InvalidParameter { parameter: "init_eta", .. }));
        let err = RpropParams { delta_min: 60.0, ..Default::default() }.validate().unwrap_err();
        assert!(matches!(err, TrainError::InvalidParameter { parameter: "delta_min", .. }));
    }

    #[test]
    fn step_produces_deltas_shaped_like_the_network() {
        let net = Network::from_identifiers(&[2, 3, 1], &["tansig", "tansig"], &mut StdRng::seed_from_u64(5)).unwrap();
        let mut rprop = Rprop::new(params(), &net);
        let mut grads = Gradients::zeros_like(&net);
        grads.layers[0].weights.data[1][2] = 0.4;
        grads.layers[1].biases[0] = -2.0;

        let deltas = rprop.step(&grads).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(deltas[0].weights.same_shape(&net.layers[0].weights));
        assert_relative_eq!(deltas[0].weights.data[1][2], -0.12, epsilon = 1e-12);
        assert_eq!(deltas[0].weights.data[0][0], 0.0);
        assert_relative_eq!(deltas[1].biases[0], 0.12, epsilon = 1e-12);
        assert_eq!(rprop.weight_step(0, 0, 0), Some(0.1));
        assert_relative_eq!(rprop.bias_step(1, 0).unwrap(), 0.12, epsilon = 1e-12);
    }
}
