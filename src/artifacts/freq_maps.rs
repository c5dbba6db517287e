//! Frequency-encoding maps for categorical columns

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Categorical columns that are frequency encoded, in encoding order
pub const ENCODED_COLUMNS: [&str; 6] = ["city", "state", "job", "merchant", "category", "zip"];

/// Value substituted for a category never seen at training time
pub const UNSEEN_CATEGORY: f64 = 0.0;

/// Per-column maps from category value to its training-set frequency
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FrequencyMaps {
    columns: HashMap<String, HashMap<String, f64>>,
}

impl FrequencyMaps {
    pub fn new(columns: HashMap<String, HashMap<String, f64>>) -> Self {
        Self { columns }
    }

    /// Load frequency maps from a JSON file of `{column: {value: frequency}}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read frequency maps from {:?}", path))?;
        serde_json::from_slice(&raw).context("Malformed frequency maps")
    }

    /// Frequency of `value` in `column`, or [`UNSEEN_CATEGORY`] when either is unknown.
    pub fn lookup(&self, column: &str, value: &str) -> f64 {
        self.columns
            .get(column)
            .and_then(|values| values.get(value))
            .copied()
            .unwrap_or(UNSEEN_CATEGORY)
    }

    /// Known values of a column, sorted
    pub fn categories(&self, column: &str) -> Vec<&str> {
        let mut values: Vec<&str> = self
            .columns
            .get(column)
            .map(|values| values.keys().map(String::as_str).collect())
            .unwrap_or_default();
        values.sort_unstable();
        values
    }

    /// Number of columns with a map
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_maps() -> FrequencyMaps {
        let mut category = HashMap::new();
        category.insert("grocery_pos".to_string(), 0.003);
        category.insert("gas_transport".to_string(), 0.1);
        category.insert("misc_net".to_string(), 0.05);

        let mut columns = HashMap::new();
        columns.insert("category".to_string(), category);
        FrequencyMaps::new(columns)
    }

    #[test]
    fn test_lookup_known_value() {
        let maps = sample_maps();
        assert_eq!(maps.lookup("category", "grocery_pos"), 0.003);
    }

    #[test]
    fn test_unseen_value_defaults_to_zero() {
        let maps = sample_maps();
        assert_eq!(maps.lookup("category", "space_travel"), 0.0);
        assert_eq!(maps.lookup("category", ""), 0.0);
        // Column without any map
        assert_eq!(maps.lookup("job", "Engineer"), 0.0);
    }

    #[test]
    fn test_categories_sorted() {
        let maps = sample_maps();
        assert_eq!(
            maps.categories("category"),
            vec!["gas_transport", "grocery_pos", "misc_net"]
        );
        assert!(maps.categories("city").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"category": {{"grocery_pos": 0.003}}, "zip": {{"10001": 0.0002}}}}"#
        )
        .unwrap();

        let maps = FrequencyMaps::load(file.path()).unwrap();
        assert_eq!(maps.column_count(), 2);
        assert_eq!(maps.lookup("zip", "10001"), 0.0002);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"category": ["grocery_pos"]}}"#).unwrap();
        assert!(FrequencyMaps::load(file.path()).is_err());

        assert!(FrequencyMaps::load("/nonexistent/freq_maps.json").is_err());
    }
}
