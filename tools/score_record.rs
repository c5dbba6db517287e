//! Score Record
//!
//! Scores a single JSON transaction record with a named model and prints
//! the verdict.

use anyhow::{Context, Result};
use card_fraud_scorer::{
    config::AppConfig, pipeline::ScoringPipeline, types::ScoringResponse, ArtifactStore,
    RawTransactionRecord,
};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Score one transaction record", long_about = None)]
struct ScoreArgs {
    /// Configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// JSON record to score ("-" reads stdin)
    #[arg(long, required_unless_present_any = ["list_models", "list_categories"])]
    record: Option<PathBuf>,

    /// Model name (defaults to scoring.default_model)
    #[arg(long)]
    model: Option<String>,

    /// Print the full JSON response instead of the verdict line
    #[arg(long)]
    json: bool,

    /// List the loaded models and exit
    #[arg(long)]
    list_models: bool,

    /// List the known merchant categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn read_record(path: &PathBuf) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read record from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read record from {:?}", path))
    }
}

fn main() -> Result<()> {
    let args = ScoreArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("card_fraud_scorer=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load_from_path(&args.config)?;
    let artifacts = Arc::new(ArtifactStore::load(&config.artifacts)?);

    if args.list_models {
        for name in artifacts.dispatcher().model_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    if args.list_categories {
        for category in artifacts.freq_maps().categories("category") {
            println!("{}", category);
        }
        return Ok(());
    }

    let record_path = args.record.context("--record is required")?;
    let model = args
        .model
        .unwrap_or_else(|| config.scoring.default_model.clone());
    let record = RawTransactionRecord::from_json(&read_record(&record_path)?)?;

    let pipeline = ScoringPipeline::new(artifacts);
    let result = pipeline.score(&record, &model);
    info!(model = %model, ok = result.is_ok(), "Record scored");

    if args.json {
        let response = ScoringResponse::from_result(uuid::Uuid::new_v4().to_string(), &result);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let verdict = result?;
    println!("{}: {}", verdict.model, verdict);
    Ok(())
}
