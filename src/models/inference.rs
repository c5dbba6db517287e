//! Model selection and inference

use crate::error::ScoringError;
use crate::models::classifier::Classifier;
use crate::types::verdict::{Label, Verdict};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Holds the loaded models by name and runs a single one per request
pub struct InferenceDispatcher {
    models: HashMap<String, Arc<dyn Classifier>>,
    /// Names in load order, for the selection surface
    order: Vec<String>,
}

impl InferenceDispatcher {
    /// Create a dispatcher from named models; later duplicates replace earlier ones
    pub fn new(models: Vec<(String, Arc<dyn Classifier>)>) -> Self {
        let mut order = Vec::with_capacity(models.len());
        let mut by_name = HashMap::with_capacity(models.len());
        for (name, model) in models {
            if by_name.insert(name.clone(), model).is_none() {
                order.push(name);
            }
        }
        Self {
            models: by_name,
            order,
        }
    }

    /// Get the number of loaded models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Selectable model names, in configuration order
    pub fn model_names(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Classifier>> {
        self.models.get(name)
    }

    /// Run the named model over a scaled vector.
    ///
    /// Unknown names are rejected; there is no fallback model.
    pub fn infer(&self, model_name: &str, features: &[f64]) -> Result<Verdict, ScoringError> {
        let model = self
            .models
            .get(model_name)
            .ok_or_else(|| ScoringError::UnknownModel(model_name.to_string()))?;

        let failure = |reason: String| ScoringError::InferenceFailure {
            model: model_name.to_string(),
            reason,
        };

        let (class, probability) = model
            .predict(features)
            .map_err(|e| failure(format!("{:#}", e)))?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(failure(format!(
                "fraud probability {} outside [0, 1]",
                probability
            )));
        }

        let verdict = Verdict {
            label: Label::from_class(class),
            probability,
            model: model_name.to_string(),
        };

        debug!(
            model = %model_name,
            kind = model.kind(),
            class = class,
            probability = probability,
            "Inference complete"
        );

        Ok(verdict)
    }
}
