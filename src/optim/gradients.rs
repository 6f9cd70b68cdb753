use crate::{math::matrix::Matrix, layers::dense::Layer, network::network::Network};

/// Gradient (or delta) buffer for one layer, shaped like its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl LayerGradients {
    pub fn zeros_like(layer: &Layer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: vec![0.0; layer.size],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.weights.is_finite() && self.biases.iter().all(|b| b.is_finite())
    }
}

/// One buffer per network layer, indexed identically to `Network::layers`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Gradients {
    pub fn zeros_like(network: &Network) -> Gradients {
        Gradients {
            layers: network.layers.iter().map(LayerGradients::zeros_like).collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(LayerGradients::is_finite)
    }
}
