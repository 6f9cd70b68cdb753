use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, layers::dense::{Layer, LayerTrace}};
use crate::error::{Result, TrainError};
use crate::math::matrix::Matrix;

/// Fully-connected feed-forward network.
///
/// `Clone` is a deep copy: a cloned network shares no buffers with its
/// source, so snapshots stay fixed while training continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds a network from node counts `[inputs, hidden..., outputs]` and one
    /// activation per weight layer.
    pub fn new<R: Rng + ?Sized>(
        nodes: &[usize],
        activations: &[ActivationFunction],
        rng: &mut R,
    ) -> Result<Network> {
        if nodes.len() < 2 {
            return Err(TrainError::InvalidTopology(format!(
                "need at least an input and an output layer, got {} node counts",
                nodes.len()
            )));
        }
        if let Some(pos) = nodes.iter().position(|&n| n == 0) {
            return Err(TrainError::InvalidTopology(format!("layer {pos} has zero nodes")));
        }
        if activations.len() != nodes.len() - 1 {
            return Err(TrainError::InvalidTopology(format!(
                "{} weight layers but {} activation functions",
                nodes.len() - 1,
                activations.len()
            )));
        }

        let layers = nodes.windows(2)
            .zip(activations.iter())
            .map(|(pair, &activation)| Layer::new(pair[1], pair[0], activation, rng))
            .collect();
        Ok(Network { layers })
    }

    /// Same as [`Network::new`] with activations given by identifier
    /// (`"tansig"`, `"purelin"`, ...).
    pub fn from_identifiers<R: Rng + ?Sized, S: AsRef<str>>(
        nodes: &[usize],
        activations: &[S],
        rng: &mut R,
    ) -> Result<Network> {
        let parsed = activations.iter()
            .map(|name| name.as_ref().parse::<ActivationFunction>())
            .collect::<Result<Vec<_>>>()?;
        Network::new(nodes, &parsed, rng)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Node counts including the input layer.
    pub fn nodes(&self) -> Vec<usize> {
        std::iter::once(self.input_size())
            .chain(self.layers.iter().map(|l| l.size))
            .collect()
    }

    /// Forward pass. Pure function of the current weights.
    ///
    /// # Panics
    /// Panics if `input.len() != self.input_size()`.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.feed_from(&current).output;
        }
        current
    }

    /// Forward pass keeping every layer's pre-activation and output.
    pub fn forward_trace(&self, input: &[f64]) -> Vec<LayerTrace> {
        let mut traces: Vec<LayerTrace> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let trace = match traces.last() {
                Some(prev) => layer.feed_from(&prev.output),
                None => layer.feed_from(input),
            };
            traces.push(trace);
        }
        traces
    }

    /// Adds a delta to one layer; frozen nodes keep their incoming weights.
    pub fn apply_delta(&mut self, layer: usize, delta_weights: &Matrix, delta_biases: &[f64]) -> Result<()> {
        let num_layers = self.layers.len();
        let target = self.layers.get_mut(layer).ok_or_else(|| TrainError::DimensionMismatch {
            context: "layer index".to_string(),
            expected: num_layers,
            actual: layer,
        })?;
        target.apply_delta(delta_weights, delta_biases)
    }

    /// Marks `node` of weight layer `layer` as frozen (or unfrozen).
    /// Returns `false` if either index is out of range.
    pub fn set_frozen_node(&mut self, layer: usize, node: usize, frozen: bool) -> bool {
        match self.layers.get_mut(layer) {
            Some(l) => l.set_frozen(node, frozen),
            None => false,
        }
    }

    pub fn is_frozen_node(&self, layer: usize, node: usize) -> bool {
        self.layers.get(layer).is_some_and(|l| l.is_frozen(node))
    }

    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(Layer::is_finite)
    }

    /// Batch forward evaluation, independent of any training state.
    pub fn simulate(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let expected = self.input_size();
        inputs.iter()
            .map(|input| {
                if input.len() != expected {
                    return Err(TrainError::DimensionMismatch {
                        context: "simulation input".to_string(),
                        expected,
                        actual: input.len(),
                    });
                }
                Ok(self.forward(input))
            })
            .collect()
    }
}

/// Evaluates `network` on every input. See [`Network::simulate`].
pub fn simulate(network: &Network, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    network.simulate(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn net() -> Network {
        Network::from_identifiers(&[2, 3, 1], &["tansig", "tansig"], &mut StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn construction_wires_layer_sizes() {
        let n = net();
        assert_eq!(n.nodes(), vec![2, 3, 1]);
        assert_eq!(n.layers[1].input_size, n.layers[0].size);
        assert_eq!(n.forward(&[0.1, 0.2]).len(), 1);
    }

    #[test]
    fn construction_rejects_bad_topology() {
        let mut rng = StdRng::seed_from_u64(0);
        let act = [ActivationFunction::Tanh];
        assert!(matches!(Network::new(&[2], &[], &mut rng), Err(TrainError::InvalidTopology(_))));
        assert!(matches!(Network::new(&[2, 0], &act, &mut rng), Err(TrainError::InvalidTopology(_))));
        assert!(matches!(Network::new(&[2, 3, 1], &act, &mut rng), Err(TrainError::InvalidTopology(_))));
        assert!(matches!(
            Network::from_identifiers(&[2, 1], &["radbas"], &mut rng),
            Err(TrainError::UnknownActivation(_))
        ));
    }

    #[test]
    fn trace_output_matches_forward_bitwise() {
        let n = net();
        let input = [0.3, -0.8];
        let trace = n.forward_trace(&input);
        let out = n.forward(&input);
        assert_eq!(trace.last().unwrap().output[0].to_bits(), out[0].to_bits());
    }

    #[test]
    fn clone_is_independent_of_later_mutation() {
        let mut n = net();
        let snapshot = n.clone();
        n.apply_delta(0, &Matrix::filled(2, 3, 0.1), &[0.1; 3]).unwrap();
        assert_ne!(snapshot, n);
        assert_eq!(snapshot.forward(&[1.0, 1.0]), net().forward(&[1.0, 1.0]));
    }

    #[test]
    fn frozen_node_indices_are_checked() {
        let mut n = net();
        assert!(n.set_frozen_node(0, 2, true));
        assert!(n.is_frozen_node(0, 2));
        assert!(!n.set_frozen_node(0, 3, true));
        assert!(!n.set_frozen_node(2, 0, true));
    }

    #[test]
    fn simulate_checks_input_dimension() {
        let n = net();
        let outputs = simulate(&n, &[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(matches!(
            n.simulate(&[vec![1.0]]),
            Err(TrainError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }
}
