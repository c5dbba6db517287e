//! Decision tree classifier evaluated from exported node arrays

use crate::models::classifier::{class_index, default_classes, Classifier};
use crate::types::verdict::FRAUD_CLASS;
use anyhow::Result;
use serde::Deserialize;

/// Marker for a missing child in scikit-learn's tree arrays
const LEAF: i64 = -1;

/// Decision tree in scikit-learn's array layout (`tree_` attributes).
///
/// `value` holds one row of per-class weights per node; counts and
/// fractions both work since only their proportions are used.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
    #[serde(default = "default_classes")]
    classes: Vec<i64>,
    /// `n_features_in_` of the fitted tree, when exported
    #[serde(default)]
    n_features: Option<usize>,
}

impl DecisionTree {
    /// Check node arrays for consistency.
    ///
    /// Children must come after their parent (the depth-first layout
    /// scikit-learn writes), which also rules out cycles.
    pub fn validate(&self) -> Result<()> {
        let n = self.children_left.len();
        if n == 0 {
            anyhow::bail!("Decision tree has no nodes");
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            anyhow::bail!("Decision tree node arrays differ in length");
        }
        if self.classes.len() < 2 {
            anyhow::bail!("Expected at least 2 classes, got {:?}", self.classes);
        }
        class_index(&self.classes, FRAUD_CLASS)?;

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            let row = &self.value[node];
            if row.len() != self.classes.len() {
                anyhow::bail!(
                    "Node {} has {} class weights, expected {}",
                    node,
                    row.len(),
                    self.classes.len()
                );
            }
            if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                anyhow::bail!("Node {} has invalid class weights", node);
            }

            if left == LEAF && right == LEAF {
                if row.iter().sum::<f64>() <= 0.0 {
                    anyhow::bail!("Leaf {} has no class weight", node);
                }
                continue;
            }

            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    anyhow::bail!("Node {} has out-of-order child {}", node, child);
                }
            }
            if self.feature[node] < 0 {
                anyhow::bail!("Split node {} has no feature", node);
            }
            if let Some(width) = self.n_features {
                if self.feature[node] as usize >= width {
                    anyhow::bail!(
                        "Node {} splits on feature {} but the tree takes {} features",
                        node,
                        self.feature[node],
                        width
                    );
                }
            }
            if !self.threshold[node].is_finite() {
                anyhow::bail!("Split node {} has a non-finite threshold", node);
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf that `features` falls into
    fn leaf_for(&self, features: &[f64]) -> Result<usize> {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            let x = features.get(feature).copied().ok_or_else(|| {
                anyhow::anyhow!(
                    "Tree splits on feature {} but only {} features were given",
                    feature,
                    features.len()
                )
            })?;
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        Ok(node)
    }
}

impl Classifier for DecisionTree {
    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn input_width(&self) -> Option<usize> {
        self.n_features
    }

    fn classify(&self, features: &[f64]) -> Result<i64> {
        let row = &self.value[self.leaf_for(features)?];
        // First maximum wins ties
        let mut best = 0;
        for (idx, weight) in row.iter().enumerate() {
            if *weight > row[best] {
                best = idx;
            }
        }
        Ok(self.classes[best])
    }

    fn estimate_probability(&self, features: &[f64]) -> Result<f64> {
        let row = &self.value[self.leaf_for(features)?];
        let total: f64 = row.iter().sum();
        Ok(row[class_index(&self.classes, FRAUD_CLASS)?] / total)
    }
}
