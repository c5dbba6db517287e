//! ONNX Runtime backed classifier

use crate::models::classifier::Classifier;
use crate::types::verdict::FRAUD_CLASS;
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Threshold used when an exported model has no label output
const DEFAULT_THRESHOLD: f64 = 0.5;

static RUNTIME: OnceCell<()> = OnceCell::new();

/// Initialize ONNX Runtime once per process
fn ensure_runtime() -> Result<()> {
    RUNTIME
        .get_or_try_init(|| -> Result<()> {
            ort::init().commit()?;
            info!("ONNX Runtime initialized");
            Ok(())
        })
        .map(|_| ())
}

/// Classifier exported to ONNX (e.g. by skl2onnx).
///
/// The session needs exclusive access while running, so runs on one model
/// are serialised.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    label_output: Option<String>,
    probability_output: String,
}

impl OnnxClassifier {
    /// Load a model file
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();
        ensure_runtime()?;

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow::anyhow!("Model {:?} has no probability output", path))?;

        info!(
            input = %input_name,
            label = ?label_output,
            probability = %probability_output,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
        })
    }

    /// Run the model once, returning the label output (if any) and fraud probability
    fn run(&self, features: &[f64]) -> Result<(Option<i64>, f64)> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let label = match &self.label_output {
            Some(name) => Some(extract_label(&outputs, name)?),
            None => None,
        };
        let probability = extract_probability(&outputs, &self.probability_output)?;

        debug!(label = ?label, probability = probability, "ONNX inference complete");
        Ok((label, probability))
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn input_width(&self) -> Option<usize> {
        None
    }

    fn classify(&self, features: &[f64]) -> Result<i64> {
        self.predict(features).map(|(class, _)| class)
    }

    fn estimate_probability(&self, features: &[f64]) -> Result<f64> {
        self.run(features).map(|(_, probability)| probability)
    }

    fn predict(&self, features: &[f64]) -> Result<(i64, f64)> {
        let (label, probability) = self.run(features)?;
        Ok((class_for(label, probability), probability))
    }
}

/// Class from the label output, or from the probability when there is none.
///
/// A probability of exactly 0.5 is legitimate, as for the native models.
fn class_for(label: Option<i64>, probability: f64) -> i64 {
    match label {
        Some(class) => class,
        None if probability > DEFAULT_THRESHOLD => FRAUD_CLASS,
        None => 0,
    }
}

/// Extract the predicted class from an int64 label tensor
fn extract_label(outputs: &SessionOutputs, name: &str) -> Result<i64> {
    let output = outputs
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Missing output {}", name))?;
    let (_, data) = output
        .try_extract_tensor::<i64>()
        .context("Label output is not an int64 tensor")?;
    first_label(data)
}

/// Single-row batch: the first entry is the predicted class
fn first_label(data: &[i64]) -> Result<i64> {
    data.first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Empty label output"))
}

/// Extract fraud probability from model output.
/// Handles both tensor outputs and seq(map) (zipmap) outputs.
fn extract_probability(outputs: &SessionOutputs, name: &str) -> Result<f64> {
    let output = outputs
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("Missing output {}", name))?;

    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return fraud_prob_from_tensor(&dims, data);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return extract_from_sequence_map(output);
    }

    anyhow::bail!("Unsupported probability output type {:?}", output.dtype())
}

/// Extract probability from seq(map(int64, float)) format
fn extract_from_sequence_map(output: &DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // Single-row batch: the first map holds class -> probability
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    fraud_prob_from_pairs(&kv_pairs)
}

/// Fraud class probability from zipmap `(class, probability)` pairs
fn fraud_prob_from_pairs(pairs: &[(i64, f32)]) -> Result<f64> {
    pairs
        .iter()
        .find(|(class_id, _)| *class_id == FRAUD_CLASS)
        .map(|(_, prob)| *prob as f64)
        .ok_or_else(|| anyhow::anyhow!("No fraud class probability in output map"))
}

/// Pick the fraud class column from a `[batch, classes]` or `[classes]` tensor
fn fraud_prob_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let num_classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => anyhow::bail!("Unexpected probability shape {:?}", dims),
    };

    let idx = match num_classes {
        // Single column already holds the positive-class score
        1 => 0,
        n if n >= 2 => FRAUD_CLASS as usize,
        _ => anyhow::bail!("Probability output has no classes"),
    };

    data.get(idx)
        .map(|&p| p as f64)
        .ok_or_else(|| anyhow::anyhow!("Probability output shorter than its shape"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_prob_from_tensor() {
        assert_eq!(fraud_prob_from_tensor(&[1, 2], &[0.25, 0.75]).unwrap(), 0.75);
        assert_eq!(fraud_prob_from_tensor(&[2], &[0.25, 0.75]).unwrap(), 0.75);
        assert_eq!(fraud_prob_from_tensor(&[1, 1], &[0.5]).unwrap(), 0.5);
    }

    #[test]
    fn test_fraud_prob_bad_shapes() {
        assert!(fraud_prob_from_tensor(&[1, 2, 3], &[0.0; 6]).is_err());
        assert!(fraud_prob_from_tensor(&[1, 0], &[]).is_err());
        assert!(fraud_prob_from_tensor(&[1, 2], &[0.1]).is_err());
    }

    #[test]
    fn test_label_output_wins_over_probability() {
        assert_eq!(class_for(Some(0), 0.9), 0);
        assert_eq!(class_for(Some(1), 0.1), 1);
    }

    #[test]
    fn test_threshold_without_label_output() {
        assert_eq!(class_for(None, 0.49), 0);
        assert_eq!(class_for(None, 0.5), 0);
        assert_eq!(class_for(None, 0.51), FRAUD_CLASS);
    }

    #[test]
    fn test_first_label() {
        assert_eq!(first_label(&[1]).unwrap(), 1);
        assert_eq!(first_label(&[0, 1]).unwrap(), 0);
        assert!(first_label(&[]).is_err());
    }

    #[test]
    fn test_fraud_prob_from_zipmap_pairs() {
        assert_eq!(fraud_prob_from_pairs(&[(0, 0.75), (1, 0.25)]).unwrap(), 0.25);
        // Key order does not matter
        assert_eq!(fraud_prob_from_pairs(&[(1, 0.5), (0, 0.5)]).unwrap(), 0.5);
        assert!(fraud_prob_from_pairs(&[(0, 1.0)]).is_err());
        assert!(fraud_prob_from_pairs(&[]).is_err());
    }

    #[test]
    fn test_missing_model_file() {
        assert!(OnnxClassifier::load("/nonexistent/model.onnx", 1).is_err());
    }
}
