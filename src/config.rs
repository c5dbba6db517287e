//! Configuration management for the scoring service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    pub request_subject: String,
    /// Subject for verdicts of requests that carry no reply subject
    pub verdict_subject: String,
}

/// Locations of the pre-trained artifacts
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArtifactsConfig {
    /// Named model files (`.onnx` or `.json`), in selection order
    pub models: Vec<ModelArtifact>,
    /// Fitted scaler (JSON)
    pub scaler: PathBuf,
    /// Frequency-encoding maps (JSON)
    pub freq_maps: PathBuf,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// One selectable model and the file it is loaded from
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub name: String,
    pub path: PathBuf,
}

impl ModelArtifact {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Scoring behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Model used when a request does not name one
    pub default_model: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests scored concurrently
    pub workers: usize,
    /// Timeout for a whole scoring call in milliseconds
    pub timeout_ms: u64,
    /// Interval between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl ArtifactsConfig {
    /// Reference deployment layout under `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            models: vec![
                ModelArtifact::new("Logistic Regression", dir.join("logistic_regression.onnx")),
                ModelArtifact::new("Decision Tree", dir.join("decision_tree.onnx")),
            ],
            scaler: dir.join("scaler.json"),
            freq_maps: dir.join("freq_maps.json"),
            onnx_threads: default_onnx_threads(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "scoring.requests".to_string(),
                verdict_subject: "scoring.verdicts".to_string(),
            },
            artifacts: ArtifactsConfig::in_dir("artifacts"),
            scoring: ScoringConfig {
                default_model: "Logistic Regression".to_string(),
            },
            pipeline: PipelineConfig {
                workers: 4,
                timeout_ms: 1000,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
