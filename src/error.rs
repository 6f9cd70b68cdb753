//! Error types for network construction and training.

use thiserror::Error;

use crate::train::outcome::TrainingOutcome;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Coarse classification of a [`TrainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any epoch runs.
    Configuration,
    /// NaN/Inf encountered mid-run.
    Numerical,
    /// Reading or writing a configuration file failed.
    Io,
}

/// Errors raised while building a network or running a training session.
#[derive(Debug, Error)]
pub enum TrainError {
    /// A scalar configuration parameter is out of its valid range.
    #[error("invalid configuration parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Layer sizes and activations do not describe a valid network.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Activation identifier not present in the lookup table.
    #[error("unknown activation function `{0}`")]
    UnknownActivation(String),

    /// Training algorithm identifier not supported.
    #[error("unknown training algorithm `{0}`")]
    UnknownTrainingAlgorithm(String),

    /// Frozen-node request addressed a node that does not exist.
    #[error("node {node} of layer {layer} is out of range")]
    NodeOutOfRange {
        /// Weight-layer index.
        layer: usize,
        /// Node index inside the layer.
        node: usize,
    },

    /// A dataset required for training holds no usable patterns.
    #[error("{set} set is empty: {reason}")]
    EmptyDataset {
        /// Which dataset (`training`, `validation`, `test`).
        set: &'static str,
        /// What was missing.
        reason: String,
    },

    /// Vector or matrix length does not match the network.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Where the mismatch was detected.
        context: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Non-finite values appeared during training. The run was aborted and
    /// `partial` holds the history and snapshots of the last healthy epoch.
    #[error("non-finite {quantity} at epoch {epoch}; training aborted")]
    Numerical {
        /// 1-based epoch in which the fault was detected.
        epoch: usize,
        /// Which quantity went non-finite (`gradient`, `weights`, ...).
        quantity: &'static str,
        /// Everything collected before the fault, tagged incomplete.
        partial: Box<TrainingOutcome>,
    },

    /// I/O failure while loading or saving JSON.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrainError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        TrainError::InvalidParameter { parameter, reason: reason.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainError::Numerical { .. } => ErrorKind::Numerical,
            TrainError::Io(_) | TrainError::Json(_) => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Epoch at which the error occurred, for mid-run failures.
    pub fn epoch(&self) -> Option<usize> {
        match self {
            TrainError::Numerical { epoch, .. } => Some(*epoch),
            _ => None,
        }
    }

    /// Partial results of an aborted run.
    pub fn partial_outcome(&self) -> Option<&TrainingOutcome> {
        match self {
            TrainError::Numerical { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Consumes the error and returns the partial results of an aborted run.
    pub fn into_partial_outcome(self) -> Option<TrainingOutcome> {
        match self {
            TrainError::Numerical { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}
