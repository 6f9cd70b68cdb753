use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};
use crate::error::{Result, TrainError};
use crate::optim::gradients::LayerGradients;

/// Fully-connected layer with a per-node frozen mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer{
    pub size: usize,
    pub input_size: usize,
    /// Shape `(input_size, size)`; column `j` holds the incoming weights of node `j`.
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
    #[serde(default)]
    frozen: Vec<bool>,
}

/// Values produced by one layer for one input, kept for backprop.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTrace {
    /// Pre-activation `z = x·W + b`.
    pub pre_activation: Vec<f64>,
    /// Activation `a = f(z)`.
    pub output: Vec<f64>,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = Matrix::random(input_size, size, rng);
        let biases = (0..size).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();

        Layer {
            size,
            input_size,
            weights,
            biases,
            activator: activation,
            frozen: vec![false; size],
        }
    }

    pub fn feed_from(&self, input: &[f64]) -> LayerTrace {
        let mut z = self.weights.left_mul(input);
        for (zj, bj) in z.iter_mut().zip(self.biases.iter()) {
            *zj += bj;
        }
        let output = z.iter().map(|&x| self.activator.function(x)).collect();
        LayerTrace { pre_activation: z, output }
    }

    /// Accumulates this layer's gradients for one pattern into `acc` and
    /// returns ∂L/∂a of the previous layer.
    ///
    /// `upstream` is ∂L/∂a for this layer's output, `input` the activation
    /// that was fed into it. Frozen nodes are included: masking happens when
    /// the delta is applied.
    pub fn compute_gradients(
        &self,
        upstream: &[f64],
        input: &[f64],
        trace: &LayerTrace,
        acc: &mut LayerGradients,
    ) -> Vec<f64> {
        // δ = error ⊙ f'(z)
        let layer_delta: Vec<f64> = upstream.iter()
            .zip(trace.pre_activation.iter())
            .map(|(e, &z)| e * self.activator.derivative(z))
            .collect();

        acc.weights.add_outer(input, &layer_delta);
        for (b, d) in acc.biases.iter_mut().zip(layer_delta.iter()) {
            *b += d;
        }

        self.weights.left_mul_transposed(&layer_delta)
    }

    /// Adds `delta_weights` / `delta_biases` to the parameters of every node
    /// that is not frozen. Contributions addressed to frozen nodes are dropped.
    pub fn apply_delta(&mut self, delta_weights: &Matrix, delta_biases: &[f64]) -> Result<()> {
        if !self.weights.same_shape(delta_weights) {
            return Err(TrainError::DimensionMismatch {
                context: "weight delta".to_string(),
                expected: self.weights.rows * self.weights.cols,
                actual: delta_weights.rows * delta_weights.cols,
            });
        }
        if delta_biases.len() != self.size {
            return Err(TrainError::DimensionMismatch {
                context: "bias delta".to_string(),
                expected: self.size,
                actual: delta_biases.len(),
            });
        }

        for (row, delta_row) in self.weights.data.iter_mut().zip(delta_weights.data.iter()) {
            for (node, (w, d)) in row.iter_mut().zip(delta_row.iter()).enumerate() {
                if !self.frozen.get(node).copied().unwrap_or(false) {
                    *w += d;
                }
            }
        }
        for (node, (b, d)) in self.biases.iter_mut().zip(delta_biases.iter()).enumerate() {
            if !self.frozen.get(node).copied().unwrap_or(false) {
                *b += d;
            }
        }
        Ok(())
    }

    /// Returns `false` when `node` is out of range.
    pub fn set_frozen(&mut self, node: usize, frozen: bool) -> bool {
        if self.frozen.len() != self.size {
            self.frozen.resize(self.size, false);
        }
        match self.frozen.get_mut(node) {
            Some(flag) => {
                *flag = frozen;
                true
            }
            None => false,
        }
    }

    pub fn is_frozen(&self, node: usize) -> bool {
        self.frozen.get(node).copied().unwrap_or(false)
    }

    pub fn is_finite(&self) -> bool {
        self.weights.is_finite() && self.biases.iter().all(|b| b.is_finite())
    }
}
