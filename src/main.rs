use std::path::Path;

use clap::Parser;
use env_logger::Env;
use log::*;

use ferrite_signs::config::load_manifest;
use ferrite_signs::network::{InputType, ModelMetadata};
use ferrite_signs::{
    Dataset, DatasetAssembler, DatasetConfig, Evaluator, NetworkBuilder, Result, RunConfig, SignClass,
    TrainedModel,
};

mod cli;

use cli::{Cli, Command};

fn main() {
    let cli = init();
    let outcome = match cli.command {
        Command::Train { config } => train(&config),
        Command::Evaluate { model, config } => evaluate(&model, &config),
    };
    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init() -> Cli {
    let cli = Cli::parse();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", cli.log_level.filter())
    }
    env_logger::init_from_env(Env::default());
    cli
}

fn train(config_path: &Path) -> Result<()> {
    let run = RunConfig::load(config_path)?;
    let Some(manifest) = run.train_manifest.as_deref() else {
        return Err(ferrite_signs::Error::InvalidConfiguration("train_manifest is not set".into()));
    };

    let train_set = dataset(&run.dataset, manifest, run.train_cache.as_deref())?;
    let model = NetworkBuilder::new(run.model_config()?)?
        .build_and_train(&train_set)?
        .with_metadata(ModelMetadata {
            description: Some(format!("trained from {}", manifest.display())),
            input_type: Some(InputType::for_dataset(&run.dataset)),
            output_labels: Some(SignClass::names(run.dataset.num_classes)),
        });
    model.save_json(&run.model_path)?;
    info!("model saved to {}", run.model_path.display());

    score(&model, &run)
}

fn evaluate(model_path: &Path, config_path: &Path) -> Result<()> {
    let run = RunConfig::load(config_path)?;
    let model = TrainedModel::load_json(model_path)?;
    info!("loaded model from {}", model_path.display());
    score(&model, &run)
}

fn score(model: &TrainedModel, run: &RunConfig) -> Result<()> {
    let Some(manifest) = run.test_manifest.as_deref() else {
        warn!("test_manifest is not set, skipping evaluation");
        return Ok(());
    };
    model.metadata().check_dataset(&run.dataset)?;
    let test_set = dataset(&run.dataset, manifest, run.test_cache.as_deref())?;
    let evaluation = Evaluator::new(model, &test_set)?.evaluate();
    println!("{}", evaluation.stats());
    Ok(())
}

/// Loads the cached dataset when there is one, otherwise assembles it from
/// the manifest and writes the cache.
fn dataset(config: &DatasetConfig, manifest: &Path, cache: Option<&Path>) -> Result<Dataset> {
    if let Some(cache) = cache.filter(|c| c.exists()) {
        info!("loading cached dataset {}", cache.display());
        return Dataset::load_json(cache);
    }
    let samples = load_manifest(manifest)?;
    let dataset = DatasetAssembler::new(*config)?.assemble(&samples)?;
    if let Some(cache) = cache {
        dataset.save_json(cache)?;
        info!("dataset cached to {}", cache.display());
    }
    Ok(dataset)
}
