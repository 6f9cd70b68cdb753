use rand::Rng;
use serde::{Serialize, Deserialize};
use std::str::FromStr;

use crate::error::{Result, TrainError};
use crate::network::network::Network;

/// Training algorithm selector. Resilient backpropagation is the only
/// supported family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingAlgorithm {
    /// Resilient backpropagation (`trainrp`).
    Rprop,
}

impl TrainingAlgorithm {
    pub fn identifier(&self) -> &'static str {
        match self {
            TrainingAlgorithm::Rprop => "trainrp",
        }
    }
}

impl FromStr for TrainingAlgorithm {
    type Err = TrainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trainrp" | "rprop" => Ok(TrainingAlgorithm::Rprop),
            _ => Err(TrainError::UnknownTrainingAlgorithm(s.to_string())),
        }
    }
}

/// Serializable description of a discriminator architecture.
///
/// Fields:
/// - `nodes`      : node counts `[inputs, hidden..., outputs]`
/// - `activations`: one activation identifier per weight layer
///                   (`"tansig"`, `"logsig"`, `"purelin"`, ...)
/// - `train_fcn`  : training algorithm identifier (`"trainrp"`)
///
/// Identifiers are kept as strings so that a spec read from JSON is only
/// checked when [`NetworkSpec::build`] is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub nodes: Vec<usize>,
    pub activations: Vec<String>,
    #[serde(default = "default_train_fcn")]
    pub train_fcn: String,
}

fn default_train_fcn() -> String {
    TrainingAlgorithm::Rprop.identifier().to_string()
}

impl NetworkSpec {
    pub fn new<S: Into<String>>(nodes: Vec<usize>, activations: Vec<S>) -> NetworkSpec {
        NetworkSpec {
            nodes,
            activations: activations.into_iter().map(Into::into).collect(),
            train_fcn: default_train_fcn(),
        }
    }

    pub fn with_train_fcn(mut self, train_fcn: impl Into<String>) -> NetworkSpec {
        self.train_fcn = train_fcn.into();
        self
    }

    pub fn algorithm(&self) -> Result<TrainingAlgorithm> {
        self.train_fcn.parse()
    }

    /// Validates every identifier and the topology, then initializes weights
    /// from `rng`.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        self.algorithm()?;
        Network::from_identifiers(&self.nodes, &self.activations, rng)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn build_accepts_known_identifiers() {
        let spec = NetworkSpec::new(vec![4, 2, 1], vec!["tansig", "tansig"]);
        let net = spec.build(&mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(net.nodes(), vec![4, 2, 1]);
    }

    #[test]
    fn build_rejects_unknown_algorithm() {
        let spec = NetworkSpec::new(vec![4, 1], vec!["tansig"]).with_train_fcn("traingd");
        let err = spec.build(&mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, TrainError::UnknownTrainingAlgorithm(ref s) if s == "traingd"));
    }

    #[test]
    fn train_fcn_defaults_when_missing_from_json() {
        let spec: NetworkSpec =
            serde_json::from_str(r#"{"nodes":[3,1],"activations":["logsig"]}"#).unwrap();
        assert_eq!(spec.algorithm().unwrap(), TrainingAlgorithm::Rprop);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        let path = path.to_str().unwrap();
        let spec = NetworkSpec::new(vec![5, 3, 1], vec!["tansig", "purelin"]);
        spec.save_json(path).unwrap();
        assert_eq!(NetworkSpec::load_json(path).unwrap(), spec);
    }
}
