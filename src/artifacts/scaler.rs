//! Fitted feature scaler

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Training column layout, used when the scaler artifact carries no column names
pub const DEFAULT_FEATURE_COLUMNS: [&str; 19] = [
    "cc_num",
    "amt",
    "city_pop",
    "lat",
    "long",
    "merch_lat",
    "merch_long",
    "gender_M",
    "hour",
    "day",
    "weekday",
    "month",
    "age",
    "city_encoded",
    "state_encoded",
    "job_encoded",
    "merchant_encoded",
    "category_encoded",
    "zip_encoded",
];

/// Column-wise transformation with fitted parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleTransform {
    /// `(x - mean) / scale`; either step may be absent
    Standard {
        mean: Option<Vec<f64>>,
        scale: Option<Vec<f64>>,
    },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScalerParams {
    Standard {
        #[serde(default)]
        mean: Option<Vec<f64>>,
        #[serde(default)]
        scale: Option<Vec<f64>>,
    },
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
    },
}

#[derive(Debug, Deserialize)]
struct ScalerFile {
    #[serde(default)]
    feature_names_in: Option<Vec<String>>,
    #[serde(flatten)]
    params: ScalerParams,
}

/// A fitted scaler together with its authoritative, ordered column list
#[derive(Debug, Clone)]
pub struct Scaler {
    columns: Vec<String>,
    transform: ScaleTransform,
}

impl Scaler {
    /// Build a scaler, checking every parameter vector against the column count
    pub fn new(columns: Vec<String>, transform: ScaleTransform) -> Result<Self> {
        if columns.is_empty() {
            anyhow::bail!("Scaler has no feature columns");
        }

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            anyhow::bail!("Duplicate scaler column {:?}", dup);
        }

        let expected = columns.len();
        let params: Vec<(&str, &Vec<f64>)> = match &transform {
            ScaleTransform::Standard { mean, scale } => mean
                .iter()
                .map(|m| ("mean", m))
                .chain(scale.iter().map(|s| ("scale", s)))
                .collect(),
            ScaleTransform::MinMax { min, scale } => vec![("min", min), ("scale", scale)],
        };

        for (name, values) in params {
            if values.len() != expected {
                anyhow::bail!(
                    "Scaler {} has {} entries, expected {} (one per column)",
                    name,
                    values.len(),
                    expected
                );
            }
            if values.iter().any(|v| !v.is_finite()) {
                anyhow::bail!("Scaler {} contains non-finite values", name);
            }
        }

        Ok(Self { columns, transform })
    }

    /// Load a scaler from its JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read scaler from {:?}", path))?;
        let file: ScalerFile = serde_json::from_slice(&raw).context("Malformed scaler")?;

        let columns = file.feature_names_in.unwrap_or_else(|| {
            DEFAULT_FEATURE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect()
        });

        let transform = match file.params {
            ScalerParams::Standard { mean, scale } => ScaleTransform::Standard { mean, scale },
            ScalerParams::MinMax { min, scale } => ScaleTransform::MinMax { min, scale },
        };

        Self::new(columns, transform)
    }

    /// Expected columns, in the order the models consume them
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Scale an aligned vector in place.
    ///
    /// `values` must follow [`Scaler::columns`]; zero standard deviations are
    /// treated as 1 so constant training columns only get centred.
    pub fn transform(&self, values: &mut [f64]) {
        debug_assert_eq!(values.len(), self.columns.len());

        match &self.transform {
            ScaleTransform::Standard { mean, scale } => {
                if let Some(mean) = mean {
                    for (v, m) in values.iter_mut().zip(mean) {
                        *v -= m;
                    }
                }
                if let Some(scale) = scale {
                    for (v, s) in values.iter_mut().zip(scale) {
                        let s = if *s == 0.0 { 1.0 } else { *s };
                        *v /= s;
                    }
                }
            }
            ScaleTransform::MinMax { min, scale } => {
                for ((v, m), s) in values.iter_mut().zip(min).zip(scale) {
                    *v = *v * s + m;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_standard_transform() {
        let scaler = Scaler::new(
            columns(&["amt", "age"]),
            ScaleTransform::Standard {
                mean: Some(vec![50.0, 40.0]),
                scale: Some(vec![25.0, 0.0]),
            },
        )
        .unwrap();

        let mut values = [100.0, 20.0];
        scaler.transform(&mut values);
        assert_eq!(values, [2.0, -20.0]);
    }

    #[test]
    fn test_standard_without_mean() {
        let scaler = Scaler::new(
            columns(&["amt"]),
            ScaleTransform::Standard {
                mean: None,
                scale: Some(vec![4.0]),
            },
        )
        .unwrap();

        let mut values = [10.0];
        scaler.transform(&mut values);
        assert_eq!(values, [2.5]);
    }

    #[test]
    fn test_min_max_transform() {
        // Fitted on hour in [2, 6]
        let scaler = Scaler::new(
            columns(&["hour"]),
            ScaleTransform::MinMax {
                min: vec![-0.5],
                scale: vec![0.25],
            },
        )
        .unwrap();

        let mut values = [4.0];
        scaler.transform(&mut values);
        assert_eq!(values, [0.5]);
    }

    #[test]
    fn test_parameter_length_mismatch() {
        let err = Scaler::new(
            columns(&["amt", "age"]),
            ScaleTransform::Standard {
                mean: Some(vec![1.0]),
                scale: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("mean"));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        assert!(Scaler::new(
            columns(&["amt", "amt"]),
            ScaleTransform::Standard {
                mean: None,
                scale: None
            },
        )
        .is_err());
    }

    #[test]
    fn test_load_with_feature_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"kind": "standard", "feature_names_in": ["amt", "hour"], "mean": [70.0, 12.0], "scale": [160.0, 6.8]}}"#
        )
        .unwrap();

        let scaler = Scaler::load(file.path()).unwrap();
        assert_eq!(scaler.columns(), &["amt".to_string(), "hour".to_string()]);
    }

    #[test]
    fn test_load_falls_back_to_default_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let min = vec![0.0; 19];
        let scale = vec![1.0; 19];
        write!(
            file,
            "{}",
            serde_json::json!({"kind": "min_max", "min": min, "scale": scale})
        )
        .unwrap();

        let scaler = Scaler::load(file.path()).unwrap();
        assert_eq!(scaler.column_count(), DEFAULT_FEATURE_COLUMNS.len());
        assert_eq!(scaler.columns()[7], "gender_M");
    }

    #[test]
    fn test_load_rejects_unknown_kind() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"kind": "robust", "center": [0.0]}}"#).unwrap();
        assert!(Scaler::load(file.path()).is_err());
    }
}
