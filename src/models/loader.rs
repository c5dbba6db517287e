//! Model artifact loader

use crate::config::ModelArtifact;
use crate::models::classifier::Classifier;
use crate::models::linear::LogisticRegression;
use crate::models::onnx::OnnxClassifier;
use crate::models::tree::DecisionTree;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Model parameters exported as JSON, tagged by model family
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModel {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl NativeModel {
    fn into_classifier(self) -> Result<Arc<dyn Classifier>> {
        Ok(match self {
            NativeModel::LogisticRegression(model) => {
                model.validate()?;
                Arc::new(model)
            }
            NativeModel::DecisionTree(model) => {
                model.validate()?;
                Arc::new(model)
            }
        })
    }
}

/// Loader for classifier artifacts, dispatching on file extension
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<Arc<dyn Classifier>> {
        let path = path.as_ref();
        info!(model = %name, path = %path.display(), "Loading model");

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let model: Arc<dyn Classifier> = match extension.as_deref() {
            Some("onnx") => Arc::new(OnnxClassifier::load(path, self.onnx_threads)?),
            Some("json") => {
                let raw = std::fs::read(path)
                    .with_context(|| format!("Failed to read model from {:?}", path))?;
                let native: NativeModel = serde_json::from_slice(&raw)
                    .with_context(|| format!("Malformed model parameters in {:?}", path))?;
                native.into_classifier()?
            }
            _ => anyhow::bail!(
                "Unsupported model file {:?} (expected .onnx or .json)",
                path
            ),
        };

        info!(
            model = %name,
            kind = model.kind(),
            input_width = ?model.input_width(),
            "Model loaded successfully"
        );

        Ok(model)
    }

    /// Load every configured model, failing on the first that cannot be loaded
    pub fn load_all_models(
        &self,
        artifacts: &[ModelArtifact],
    ) -> std::result::Result<Vec<(String, Arc<dyn Classifier>)>, (ModelArtifact, anyhow::Error)>
    {
        artifacts
            .iter()
            .map(|artifact| {
                self.load_model(&artifact.path, &artifact.name)
                    .map(|model| (artifact.name.clone(), model))
                    .map_err(|e| (artifact.clone(), e))
            })
            .collect()
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
