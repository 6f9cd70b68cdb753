use serde::{Serialize, Deserialize};
use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

use crate::error::TrainError;

/// Transfer function applied element-wise after a layer's linear transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    /// Linear output (`purelin`).
    Identity,
    /// Hyperbolic tangent (`tansig`).
    Tanh,
    /// Logistic sigmoid (`logsig`).
    Sigmoid,
}

/// Identifier lookup table. The first name listed for a variant is its
/// canonical identifier.
const IDENTIFIERS: &[(&str, ActivationFunction)] = &[
    ("purelin", ActivationFunction::Identity),
    ("identity", ActivationFunction::Identity),
    ("linear", ActivationFunction::Identity),
    ("tansig", ActivationFunction::Tanh),
    ("tanh", ActivationFunction::Tanh),
    ("logsig", ActivationFunction::Sigmoid),
    ("sigmoid", ActivationFunction::Sigmoid),
];

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
        }
    }

    /// Derivative with respect to the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
        }
    }

    pub fn identifier(&self) -> &'static str {
        IDENTIFIERS.iter()
            .find(|(_, f)| f == self)
            .map(|(name, _)| *name)
            .unwrap_or("purelin")
    }
}

impl FromStr for ActivationFunction {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        IDENTIFIERS.iter()
            .find(|(name, _)| *name == key)
            .map(|(_, f)| *f)
            .ok_or_else(|| TrainError::UnknownActivation(s.to_string()))
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
