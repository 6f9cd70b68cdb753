// Demo: trains a small discriminator on two overlapping Gaussian clouds under
// the multi-stop goal and reports the three snapshots it produces.
//
//   RUST_LOG=debug cargo run
use std::f64::consts::PI;

use ferrite_tune::{
    evaluate, ClassTargets, NetworkSpec, PatternSet, TrainConfig, TrainGoal, Trainer,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn cloud(rng: &mut StdRng, center: f64, n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..4).map(|_| center + sample_standard_normal(rng)).collect())
        .collect()
}

fn dataset(rng: &mut StdRng, n: usize) -> PatternSet {
    PatternSet::new(cloud(rng, 0.6, n), cloud(rng, -0.6, n))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut rng = StdRng::seed_from_u64(2024);
    let train = dataset(&mut rng, 400);
    let validation = dataset(&mut rng, 200);
    let test = dataset(&mut rng, 200);
    let operation = dataset(&mut rng, 500);

    let targets = ClassTargets { signal: 1.0, noise: -1.0 };
    let config = TrainConfig::new(300, TrainGoal::MultiStop)
        .with_batch_size(200)
        .with_max_fail(25)
        .with_targets(targets)
        .with_show(25)
        .with_seed(7);
    let spec = NetworkSpec::new(vec![4, 5, 1], vec!["tansig", "tansig"]);

    let trainer = Trainer::new(&spec, config)?;
    let outcome = trainer.train(&train, &validation, Some(&test))?;

    println!("termination: {:?} after {} epochs", outcome.termination, outcome.epochs_run());
    for snapshot in &outcome.snapshots {
        let perf = evaluate(&snapshot.network, &operation, targets, 1000);
        println!(
            "best by {:<12} epoch {:>4}  operation sp = {:.4}  det = {:.4}  fa = {:.4}",
            snapshot.criterion.to_string(),
            snapshot.epoch.map_or("init".to_string(), |e| e.to_string()),
            perf.sp(),
            perf.detection(),
            perf.false_alarm(),
        );
    }
    Ok(())
}
