//! Error taxonomy for the scoring pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading artifacts or scoring a transaction
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A required artifact is missing or malformed. Fatal at startup.
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    /// A raw field could not be interpreted
    #[error("invalid input field `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The requested model name is not among the loaded models
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// The model itself failed to produce a usable result
    #[error("inference failed for model `{model}`: {reason}")]
    InferenceFailure { model: String, reason: String },
}

impl ScoringError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoringError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn artifact_load(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        ScoringError::ArtifactLoad {
            path: path.into(),
            reason: format!("{:#}", err),
        }
    }

    /// Short, stable name used in responses and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::ArtifactLoad { .. } => "artifact_load",
            ScoringError::InvalidInput { .. } => "invalid_input",
            ScoringError::UnknownModel(_) => "unknown_model",
            ScoringError::InferenceFailure { .. } => "inference_failure",
        }
    }

    /// Whether the process can keep serving after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScoringError::ArtifactLoad { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = ScoringError::UnknownModel("NonexistentModel".to_string());
        assert_eq!(err.kind(), "unknown_model");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "unknown model `NonexistentModel`");

        let err =
            ScoringError::artifact_load("artifacts/scaler.json", &anyhow::anyhow!("not found"));
        assert_eq!(err.kind(), "artifact_load");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("artifacts/scaler.json"));
    }

    #[test]
    fn test_invalid_input_message() {
        let err = ScoringError::invalid_input("cc_num", "expected digits only");
        assert_eq!(
            err.to_string(),
            "invalid input field `cc_num`: expected digits only"
        );
    }
}
