use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::data::pattern_set::{PatternClass, PatternSet};
use crate::error::{Result, TrainError};
use crate::loss::mse::MseLoss;
use crate::network::network::Network;
use crate::optim::gradients::Gradients;
use crate::optim::rprop::Rprop;
use crate::perf::evaluate::evaluate;
use crate::stop::evaluator::StoppingEvaluator;
use crate::train::outcome::{Termination, TrainingOutcome};
use crate::train::record::TrainingRecord;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains a copy of `network` and returns the best snapshots and the epoch
/// history. `network` itself is never modified.
///
/// # Arguments
/// - `network`   : initial weights; must have a single output node
/// - `train`     : training patterns (at least one)
/// - `validation`: drives stopping and snapshot selection; needs both classes
/// - `test`      : optional; its MSE/SP are recorded but never used to decide
/// - `config`    : hyperparameters, optional progress channel, optional stop flag
///
/// # Errors
/// Every configuration problem is reported before the first epoch runs.
/// A NaN/Inf in gradients, weights or validation metrics aborts the run with
/// [`TrainError::Numerical`], which carries the snapshots and history of the
/// last healthy epoch tagged as incomplete.
///
/// # Early termination
/// Besides the goal's stopping criteria, the loop ends early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true` (checked at epoch boundaries only).
pub fn train_loop(
    network: &Network,
    train: &PatternSet,
    validation: &PatternSet,
    test: Option<&PatternSet>,
    config: &TrainConfig,
) -> Result<TrainingOutcome> {
    config.validate()?;
    check_network(network)?;
    let input_size = network.input_size();
    train.check("training", input_size, false)?;
    validation.check("validation", input_size, true)?;
    if let Some(test) = test {
        test.check("test", input_size, true)?;
    }

    let mut rng = config.sampling_rng();
    let mut network = network.clone();
    let mut rprop = Rprop::new(config.rprop, &network);
    let mut stopping = config.max_fail_overrides.iter().fold(
        StoppingEvaluator::new(config.goal, config.max_fail, &network),
        |ev, (&criterion, &max_fail)| ev.with_max_fail(criterion, max_fail),
    );

    let patterns: Vec<(&[f64], PatternClass)> = train.iter().collect();
    let mut indices: Vec<usize> = (0..patterns.len()).collect();
    let batch_size = match config.batch_size {
        0 => patterns.len(),
        n => n.min(patterns.len()),
    };

    info!(
        epochs = config.epochs,
        batch_size,
        goal = ?config.goal,
        train = train.len(),
        validation = validation.len(),
        "starting training"
    );

    let mut history: Vec<TrainingRecord> = Vec::new();
    let mut termination = Termination::EpochBudget;

    for epoch in 1..=config.epochs {
        // Check stop flag at the top of each epoch.
        if let Some(ref flag) = config.stop_flag {
            if flag.load(Ordering::Relaxed) {
                termination = Termination::Cancelled { epoch: epoch - 1 };
                break;
            }
        }

        let t_start = Instant::now();

        // ── One batch, one update ─────────────────────────────────────────
        if batch_size < patterns.len() {
            indices.shuffle(&mut rng);
        }
        let (gradients, mse_trn) = run_one_epoch(&network, &patterns, &indices[..batch_size], config);
        if !gradients.is_finite() || !mse_trn.is_finite() {
            return Err(abort(epoch, "gradient", history, &stopping));
        }

        let deltas = rprop.step(&gradients)?;
        for (layer, delta) in deltas.iter().enumerate() {
            network.apply_delta(layer, &delta.weights, &delta.biases)?;
        }
        if !network.is_finite() {
            return Err(abort(epoch, "weights", history, &stopping));
        }

        // ── Validation ────────────────────────────────────────────────────
        let val = evaluate(&network, validation, config.targets, config.roc_points);
        if !val.is_finite() {
            return Err(abort(epoch, "validation metrics", history, &stopping));
        }
        let tst = test.map(|set| evaluate(&network, set, config.targets, config.roc_points));

        let criteria = stopping.evaluate(epoch, &val, &network);

        let record = TrainingRecord {
            epoch,
            mse_trn,
            mse_val: val.mse,
            sp_val: val.sp(),
            det_val: val.detection(),
            fa_val: val.false_alarm(),
            mse_tst: tst.map(|t| t.mse),
            sp_tst: tst.map(|t| t.sp()),
            criteria,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };

        if config.show > 0 && epoch % config.show == 0 {
            log_progress(&record);
        }

        // ── Emit progress ─────────────────────────────────────────────────
        // If the receiver has been dropped, stop training.
        let receiver_gone = config.progress_tx
            .as_ref()
            .is_some_and(|tx| tx.send(record.clone()).is_err());
        history.push(record);

        if stopping.should_stop() {
            termination = Termination::GoalReached { epoch };
            break;
        }
        if receiver_gone {
            termination = Termination::Cancelled { epoch };
            break;
        }
    }

    info!(epochs_run = history.len(), termination = ?termination, "training finished");

    Ok(TrainingOutcome {
        snapshots: stopping.snapshots(),
        tracked: stopping.tracked_snapshots(),
        history,
        termination,
        complete: true,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_network(network: &Network) -> Result<()> {
    if network.num_layers() == 0 {
        return Err(TrainError::InvalidTopology("network has no layers".to_string()));
    }
    if network.output_size() != 1 {
        return Err(TrainError::InvalidTopology(format!(
            "a discriminator needs exactly one output node, got {}",
            network.output_size()
        )));
    }
    if !network.is_finite() {
        return Err(TrainError::invalid("network", "initial weights contain NaN or Inf"));
    }
    Ok(())
}

/// Accumulates the class-weighted MSE gradient over one batch.
/// Returns the summed gradients and the batch's mean squared error.
fn run_one_epoch(
    network: &Network,
    patterns: &[(&[f64], PatternClass)],
    batch: &[usize],
    config: &TrainConfig,
) -> (Gradients, f64) {
    let mut gradients = Gradients::zeros_like(network);
    let mut total_loss = 0.0;

    for &idx in batch {
        let (input, class) = patterns[idx];
        let traces = network.forward_trace(input);
        let Some(output) = traces.last().map(|t| t.output.as_slice()) else { continue };

        let expected = [config.targets.target(class)];
        total_loss += MseLoss::loss(output, &expected);
        let mut delta = MseLoss::weighted_derivative(output, &expected, config.class_weight(class));

        // Backward pass.
        for i in (0..network.layers.len()).rev() {
            let layer_input: &[f64] = if i == 0 { input } else { &traces[i - 1].output };
            delta = network.layers[i].compute_gradients(&delta, layer_input, &traces[i], &mut gradients.layers[i]);
        }
    }

    (gradients, total_loss / batch.len().max(1) as f64)
}

fn abort(epoch: usize, quantity: &'static str, history: Vec<TrainingRecord>, stopping: &StoppingEvaluator) -> TrainError {
    warn!(epoch, quantity, "non-finite values, aborting training");
    TrainError::Numerical {
        epoch,
        quantity,
        partial: Box::new(TrainingOutcome {
            snapshots: stopping.snapshots(),
            tracked: stopping.tracked_snapshots(),
            history,
            termination: Termination::Aborted { epoch },
            complete: false,
        }),
    }
}

fn log_progress(record: &TrainingRecord) {
    info!(
        epoch = record.epoch,
        mse_trn = record.mse_trn,
        mse_val = record.mse_val,
        sp_val = record.sp_val,
        det_val = record.det_val,
        fa_val = record.fa_val,
        fails_mse = record.num_fails_mse(),
        fails_sp = record.num_fails_sp(),
        "epoch"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use crate::activation::activation::ActivationFunction;
    use crate::stop::criterion::TrainGoal;
    use rand::{rngs::StdRng, SeedableRng};

    fn net() -> Network {
        Network::new(&[2, 3, 1], &[ActivationFunction::Tanh, ActivationFunction::Sigmoid], &mut StdRng::seed_from_u64(4)).unwrap()
    }

    fn set() -> PatternSet {
        PatternSet::new(
            vec![vec![1.0, 1.0], vec![0.8, 1.2], vec![1.1, 0.9]],
            vec![vec![-1.0, -1.0], vec![-0.9, -1.1], vec![-1.2, -0.7]],
        )
    }

    #[test]
    fn epoch_gradient_sums_over_batch() {
        let network = net();
        let train = set();
        let patterns: Vec<_> = train.iter().collect();
        let config = TrainConfig::default();

        let (all, _) = run_one_epoch(&network, &patterns, &[0, 1, 2, 3, 4, 5], &config);
        let (first, _) = run_one_epoch(&network, &patterns, &[0, 1, 2], &config);
        let (second, _) = run_one_epoch(&network, &patterns, &[3, 4, 5], &config);
        let sum = first.layers[1].biases[0] + second.layers[1].biases[0];
        assert!((all.layers[1].biases[0] - sum).abs() < 1e-12);
    }

    #[test]
    fn class_weight_scales_gradient() {
        let network = net();
        let train = PatternSet::new(vec![vec![1.0, 1.0]], vec![]);
        let patterns: Vec<_> = train.iter().collect();
        let (g1, _) = run_one_epoch(&network, &patterns, &[0], &TrainConfig::default());
        let (g3, _) = run_one_epoch(&network, &patterns, &[0], &TrainConfig::default().with_class_weights(3.0, 1.0));
        assert!((g3.layers[0].weights.data[0][0] - 3.0 * g1.layers[0].weights.data[0][0]).abs() < 1e-12);
    }

    #[test]
    fn non_finite_network_is_rejected_up_front() {
        let mut network = net();
        network.layers[0].weights = Matrix::filled(2, 3, f64::NAN);
        let err = train_loop(&network, &set(), &set(), None, &TrainConfig::new(5, TrainGoal::SpStop)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn multi_output_network_is_rejected() {
        let network = Network::new(&[2, 2], &[ActivationFunction::Tanh], &mut StdRng::seed_from_u64(0)).unwrap();
        let err = train_loop(&network, &set(), &set(), None, &TrainConfig::default()).unwrap_err();
        assert!(matches!(err, TrainError::InvalidTopology(_)));
    }
}
