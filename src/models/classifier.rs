//! Capability shared by every loaded model

use anyhow::Result;

/// A pre-trained binary classifier over a scaled feature vector.
///
/// Implementations are immutable after load and shared across requests.
pub trait Classifier: Send + Sync {
    /// Short description of the model family, for logs
    fn kind(&self) -> &'static str;

    /// Exact input width, when the artifact declares one
    fn input_width(&self) -> Option<usize>;

    /// Discrete class for the vector
    fn classify(&self, features: &[f64]) -> Result<i64>;

    /// Probability of the fraud class
    fn estimate_probability(&self, features: &[f64]) -> Result<f64>;

    /// Class and fraud probability in one call.
    ///
    /// Models that compute both in a single forward pass override this.
    fn predict(&self, features: &[f64]) -> Result<(i64, f64)> {
        Ok((self.classify(features)?, self.estimate_probability(features)?))
    }
}

/// Index of `class` in a model's class list
pub(crate) fn class_index(classes: &[i64], class: i64) -> Result<usize> {
    classes
        .iter()
        .position(|&c| c == class)
        .ok_or_else(|| anyhow::anyhow!("Class {} not among model classes {:?}", class, classes))
}

pub(crate) fn default_classes() -> Vec<i64> {
    vec![0, 1]
}
