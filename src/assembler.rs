//! Aligns engineered features to the scaler's column order and scales them

use crate::artifacts::scaler::Scaler;
use crate::feature_encoder::EngineeredFeatures;
use std::sync::Arc;
use tracing::trace;

/// Value for expected columns the encoder did not produce
pub const MISSING_FEATURE: f64 = 0.0;

/// Builds the model input vector from engineered features
pub struct VectorAssembler {
    scaler: Arc<Scaler>,
}

impl VectorAssembler {
    pub fn new(scaler: Arc<Scaler>) -> Self {
        Self { scaler }
    }

    /// Align, fill and scale.
    ///
    /// The output has exactly one entry per scaler column, in the scaler's
    /// order. Missing columns are filled with [`MISSING_FEATURE`] before
    /// scaling, and columns the scaler does not know are dropped.
    pub fn assemble(&self, features: &EngineeredFeatures) -> Vec<f64> {
        let mut vector = self.align(features);
        self.scaler.transform(&mut vector);
        vector
    }

    /// Aligned but unscaled vector
    pub fn align(&self, features: &EngineeredFeatures) -> Vec<f64> {
        let columns = self.scaler.columns();
        let mut missing = 0usize;
        let vector: Vec<f64> = columns
            .iter()
            .map(|column| {
                features.get(column).unwrap_or_else(|| {
                    missing += 1;
                    MISSING_FEATURE
                })
            })
            .collect();

        if missing > 0 {
            trace!(missing = missing, "Filled missing feature columns");
        }
        vector
    }

    pub fn width(&self) -> usize {
        self.scaler.column_count()
    }
}
