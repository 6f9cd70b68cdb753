use crate::{
    data::pattern_set::PatternSet,
    error::{Result, TrainError},
    network::{network::Network, spec::NetworkSpec},
    train::{loop_fn::train_loop, outcome::TrainingOutcome, train_config::TrainConfig},
};

/// A network under configuration plus the settings it will be trained with.
///
/// Both can be adjusted freely between runs; each call to [`Trainer::train`]
/// starts from the current network and leaves it unchanged.
#[derive(Debug, Clone)]
pub struct Trainer {
    network: Network,
    config: TrainConfig,
}

impl Trainer {
    /// Validates `config`, then builds the network described by `spec` with
    /// weights drawn from the configured seed.
    pub fn new(spec: &NetworkSpec, config: TrainConfig) -> Result<Trainer> {
        config.validate()?;
        let network = spec.build(&mut config.rng())?;
        Ok(Trainer { network, config })
    }

    pub fn from_network(network: Network, config: TrainConfig) -> Trainer {
        Trainer { network, config }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TrainConfig {
        &mut self.config
    }

    /// Excludes (or re-includes) a node's incoming weights from updates.
    pub fn set_frozen_node(&mut self, layer: usize, node: usize, frozen: bool) -> Result<()> {
        if self.network.set_frozen_node(layer, node, frozen) {
            Ok(())
        } else {
            Err(TrainError::NodeOutOfRange { layer, node })
        }
    }

    pub fn train(
        &self,
        train: &PatternSet,
        validation: &PatternSet,
        test: Option<&PatternSet>,
    ) -> Result<TrainingOutcome> {
        train_loop(&self.network, train, validation, test, &self.config)
    }
}
