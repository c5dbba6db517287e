//! Binary logistic regression evaluated from exported coefficients

use crate::models::classifier::{class_index, default_classes, Classifier};
use crate::types::verdict::FRAUD_CLASS;
use anyhow::Result;
use serde::Deserialize;

/// Logistic regression parameters in scikit-learn's layout
/// (`coef_` of shape `[1, n_features]`, `intercept_` of shape `[1]`).
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default = "default_classes")]
    classes: Vec<i64>,
}

impl LogisticRegression {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self {
            coef: vec![coef],
            intercept: vec![intercept],
            classes: default_classes(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Check the shapes of deserialized parameters
    pub fn validate(&self) -> Result<()> {
        if self.coef.len() != 1 || self.intercept.len() != 1 {
            anyhow::bail!(
                "Expected a binary model (1 coefficient row, 1 intercept), got {} rows and {} intercepts",
                self.coef.len(),
                self.intercept.len()
            );
        }
        if self.coef[0].is_empty() {
            anyhow::bail!("Logistic regression has no coefficients");
        }
        if self.classes.len() != 2 {
            anyhow::bail!("Expected 2 classes, got {:?}", self.classes);
        }
        class_index(&self.classes, FRAUD_CLASS)?;
        if self.coef[0].iter().chain(&self.intercept).any(|v| !v.is_finite()) {
            anyhow::bail!("Logistic regression parameters contain non-finite values");
        }
        Ok(())
    }

    fn decision_function(&self, features: &[f64]) -> Result<f64> {
        let coef = &self.coef[0];
        if features.len() != coef.len() {
            anyhow::bail!(
                "Expected {} features, got {}",
                coef.len(),
                features.len()
            );
        }
        let dot: f64 = coef.iter().zip(features).map(|(w, x)| w * x).sum();
        Ok(dot + self.intercept[0])
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.coef[0].len())
    }

    fn classify(&self, features: &[f64]) -> Result<i64> {
        // Positive decision selects the second class
        let idx = if self.decision_function(features)? > 0.0 { 1 } else { 0 };
        Ok(self.classes[idx])
    }

    fn estimate_probability(&self, features: &[f64]) -> Result<f64> {
        let p_second = sigmoid(self.decision_function(features)?);
        Ok(if class_index(&self.classes, FRAUD_CLASS)? == 1 {
            p_second
        } else {
            1.0 - p_second
        })
    }
}
