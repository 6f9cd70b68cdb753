use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::data::pattern_set::{ClassTargets, PatternClass};
use crate::error::{Result, TrainError};
use crate::optim::rprop::RpropParams;
use crate::stop::criterion::{Criterion, TrainGoal};
use crate::train::record::TrainingRecord;

/// Offset added to the seed for the batch-sampling generator.
const SAMPLING_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`            : epoch budget; a run never records more epochs
/// - `batch_size`        : patterns drawn per epoch; `0` (or anything at
///                          least the training-set size) means full batch
/// - `max_fail`          : consecutive non-improving epochs before a
///                          criterion stops
/// - `max_fail_overrides`: per-criterion patience replacing `max_fail`
/// - `goal`              : `MseStop`, `SpStop` or `MultiStop`
/// - `rprop`             : step-size schedule
/// - `sp_signal_weight` / `sp_noise_weight`: class weights applied to the
///                          error gradient of each pattern
/// - `targets`           : output targets for signal and noise
/// - `roc_points`        : resolution of the threshold sweep behind SP
/// - `show`              : log a progress line every `show` epochs (0 = off)
/// - `seed`              : seeds weight initialization and batch sampling
/// - `progress_tx`       : optional channel sender; one `TrainingRecord` is
///                          sent per completed epoch.  If the receiver is
///                          dropped the loop terminates early.
/// - `stop_flag`         : optional atomic flag; when set to `true` from another
///                          thread the loop terminates after the current epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub max_fail: usize,
    pub max_fail_overrides: BTreeMap<Criterion, usize>,
    pub goal: TrainGoal,
    pub rprop: RpropParams,
    pub sp_signal_weight: f64,
    pub sp_noise_weight: f64,
    pub targets: ClassTargets,
    pub roc_points: usize,
    pub show: usize,
    pub seed: Option<u64>,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<TrainingRecord>>,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 1000,
            batch_size: 100,
            max_fail: 50,
            max_fail_overrides: BTreeMap::new(),
            goal: TrainGoal::SpStop,
            rprop: RpropParams::default(),
            sp_signal_weight: 1.0,
            sp_noise_weight: 1.0,
            targets: ClassTargets::default(),
            roc_points: 1000,
            show: 5,
            seed: None,
            progress_tx: None,
            stop_flag: None,
        }
    }
}

impl TrainConfig {
    /// Creates a `TrainConfig` with default hyperparameters and the given budget and goal.
    pub fn new(epochs: usize, goal: TrainGoal) -> Self {
        TrainConfig { epochs, goal, ..Default::default() }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_fail(mut self, max_fail: usize) -> Self {
        self.max_fail = max_fail;
        self
    }

    pub fn with_max_fail_for(mut self, criterion: Criterion, max_fail: usize) -> Self {
        self.max_fail_overrides.insert(criterion, max_fail);
        self
    }

    pub fn with_goal(mut self, goal: TrainGoal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_rprop(mut self, rprop: RpropParams) -> Self {
        self.rprop = rprop;
        self
    }

    pub fn with_class_weights(mut self, signal: f64, noise: f64) -> Self {
        self.sp_signal_weight = signal;
        self.sp_noise_weight = noise;
        self
    }

    pub fn with_targets(mut self, targets: ClassTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_roc_points(mut self, roc_points: usize) -> Self {
        self.roc_points = roc_points;
        self
    }

    pub fn with_show(mut self, show: usize) -> Self {
        self.show = show;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<TrainingRecord>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// Patience of `criterion`.
    pub fn max_fail_for(&self, criterion: Criterion) -> usize {
        self.max_fail_overrides.get(&criterion).copied().unwrap_or(self.max_fail)
    }

    pub fn class_weight(&self, class: PatternClass) -> f64 {
        match class {
            PatternClass::Signal => self.sp_signal_weight,
            PatternClass::Noise => self.sp_noise_weight,
        }
    }

    /// Generator for weight initialization. Entropy-seeded when no seed is
    /// configured.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Generator for per-epoch batch sampling, on a stream distinct from
    /// [`TrainConfig::rng`].
    pub fn sampling_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(SAMPLING_STREAM)),
            None => StdRng::from_entropy(),
        }
    }

    /// Rejects any parameter a run could not start with.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainError::invalid("epochs", "epoch budget must be at least 1"));
        }
        if self.max_fail == 0 {
            return Err(TrainError::invalid("max_fail", "must be at least 1"));
        }
        if let Some((criterion, _)) = self.max_fail_overrides.iter().find(|(_, &n)| n == 0) {
            return Err(TrainError::invalid(
                "max_fail_overrides",
                format!("patience of `{criterion}` must be at least 1"),
            ));
        }
        let tracked = self.goal.roles();
        if let Some(criterion) = self.max_fail_overrides.keys().find(|c| !tracked.iter().any(|r| r.criterion == **c)) {
            return Err(TrainError::invalid(
                "max_fail_overrides",
                format!("`{criterion}` is not tracked under {:?}", self.goal),
            ));
        }
        for (name, weight) in [("sp_signal_weight", self.sp_signal_weight), ("sp_noise_weight", self.sp_noise_weight)] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(TrainError::invalid(name, format!("must be a finite positive number, got {weight}")));
            }
        }
        if self.roc_points < 2 {
            return Err(TrainError::invalid("roc_points", format!("need at least 2, got {}", self.roc_points)));
        }
        self.targets.validate()?;
        self.rprop.validate()
    }

    /// Serializes the configuration (without runtime channels) to pretty-printed JSON.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a configuration; missing fields take their defaults.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
