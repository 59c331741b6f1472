//! Run Preparation Example
//!
//! Walks through the full lifecycle: derive an experiment identifier from
//! hyperparameters, prepare a run directory, hand checkpoint paths to a
//! (simulated) training loop, then resume from the latest checkpoint.
//!
//! Run with: cargo run --example run_preparation

use anyhow::Result;
use expman::{params, ExperimentManager, MonitorMode, MonitorSpec};
use serde_json::json;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expman=debug".into()),
        )
        .init();

    println!("=== Expman Run Preparation ===\n");

    // -------------------------------------------------------------------------
    // 1. Describe the experiment
    // -------------------------------------------------------------------------
    println!("1. Collecting hyperparameters...");

    let params = params::from_serialize(&json!({
        "model": {"architecture": "cnn", "layers": 4, "dropout": 0.1},
        "training": {"batch_size": 128, "epochs": 5, "learning-rate": 0.008},
        "processing": {"width": 128, "height": 128},
        "comment": "demo run, untracked group",
    }))?;

    let manager = ExperimentManager::builder()
        .base_dir("experiments")
        .monitored_keys(["model", "training", "processing"])
        .monitor(MonitorSpec::new("val_loss", MonitorMode::Min))
        .build();

    let id = manager.experiment_id(&params)?;
    println!("   Experiment ID: {id}");
    println!("   Segments: {:?}", id.segments());

    // -------------------------------------------------------------------------
    // 2. Prepare the run directory
    // -------------------------------------------------------------------------
    println!("\n2. Preparing run directory...");

    let handle = manager.prepare(&params)?;
    println!("   Run dir: {}", handle.run_dir().display());
    println!("   Snapshot: {}", handle.hyperparams_file().display());
    println!("   Template: {}", handle.model_filename_template());

    // -------------------------------------------------------------------------
    // 3. Simulate a training loop writing checkpoints
    // -------------------------------------------------------------------------
    println!("\n3. Simulating training (5 epochs)...");

    let mut latest = None;
    for epoch in 0..5 {
        let val_loss = 2.5 / f64::from(epoch + 1) + 0.1;
        let checkpoint = handle.model_checkpoint_path(epoch, val_loss);
        std::fs::write(&checkpoint, b"weights go here")?;
        println!(
            "   Epoch {}: val_loss={:.4} -> {}",
            epoch,
            val_loss,
            checkpoint.display()
        );
        latest = Some(checkpoint);
    }

    // -------------------------------------------------------------------------
    // 4. Resume from the latest checkpoint
    // -------------------------------------------------------------------------
    println!("\n4. Resuming...");

    let run_folder = handle.stamp().folder_name();
    let resumed = manager.resume(&id.folder_name(), &run_folder)?;
    println!(
        "   Latest checkpoint: {}",
        resumed
            .latest_checkpoint()
            .map_or_else(|| "<none>".to_string(), |p| p.display().to_string())
    );
    assert_eq!(resumed.latest_checkpoint(), latest.as_deref());

    println!("\n=== Run Preparation Complete ===");
    Ok(())
}
