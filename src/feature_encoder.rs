//! Feature encoding for fraud model inference.
//!
//! Turns a raw transaction into the engineered columns the scaler and models
//! were fitted on. The derivations must match the training preprocessing
//! exactly, including its simplifications:
//!
//! - `weekday` counts from Monday = 0 to Sunday = 6;
//! - `age` is the difference of calendar years only, ignoring month and day.

use crate::artifacts::freq_maps::{FrequencyMaps, ENCODED_COLUMNS};
use crate::error::ScoringError;
use crate::types::record::RawTransactionRecord;
use chrono::{Datelike, Timelike};
use std::collections::HashMap;
use std::sync::Arc;

/// Engineered column name -> value, before alignment and scaling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineeredFeatures {
    values: HashMap<String, f64>,
}

impl EngineeredFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names, sorted
    pub fn columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Name of the frequency-encoded column for a categorical column
pub fn encoded_column(column: &str) -> String {
    format!("{}_encoded", column)
}

/// Feature encoder that transforms raw records into engineered columns.
///
/// Pure: reads only the record and the frequency maps it was built with.
pub struct FeatureEncoder {
    freq_maps: Arc<FrequencyMaps>,
}

impl FeatureEncoder {
    /// Create a new feature encoder.
    pub fn new(freq_maps: Arc<FrequencyMaps>) -> Self {
        Self { freq_maps }
    }

    /// Encode a record.
    ///
    /// Free-text identity fields (names, street) and dataset identifiers are
    /// never read. Absent optional fields produce no column.
    pub fn encode(&self, tx: &RawTransactionRecord) -> Result<EngineeredFeatures, ScoringError> {
        let mut features = EngineeredFeatures::new();

        // Pass-through numerics
        features.insert("cc_num", parse_card_number(&tx.cc_num)?);
        features.insert("amt", check_amount(tx.amt)?);
        if let Some(city_pop) = tx.city_pop {
            features.insert("city_pop", city_pop as f64);
        }
        for (column, value) in [
            ("lat", tx.lat),
            ("long", tx.long),
            ("merch_lat", tx.merch_lat),
            ("merch_long", tx.merch_long),
        ] {
            if let Some(value) = value {
                features.insert(column, check_finite(column, value)?);
            }
        }

        // Time of transaction
        let ts = tx.trans_date_trans_time;
        features.insert("hour", ts.hour() as f64);
        features.insert("day", ts.day() as f64);
        features.insert("weekday", ts.weekday().num_days_from_monday() as f64);
        features.insert("month", ts.month() as f64);

        // Age by calendar year, zero or negative for a later birth date
        features.insert("age", (ts.year() - tx.dob.year()) as f64);

        let is_male = tx.gender.as_deref() == Some("M");
        features.insert("gender_M", if is_male { 1.0 } else { 0.0 });

        // Frequency encoding
        for column in ENCODED_COLUMNS {
            if let Some(value) = categorical_value(tx, column) {
                features.insert(encoded_column(column), self.freq_maps.lookup(column, value));
            }
        }

        Ok(features)
    }

    /// Every column the encoder can produce
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            "cc_num", "amt", "city_pop", "lat", "long", "merch_lat", "merch_long", "hour", "day",
            "weekday", "month", "age", "gender_M",
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        names.extend(ENCODED_COLUMNS.iter().map(|column| encoded_column(column)));
        names
    }
}

fn categorical_value<'a>(tx: &'a RawTransactionRecord, column: &str) -> Option<&'a str> {
    let value = match column {
        "city" => &tx.city,
        "state" => &tx.state,
        "job" => &tx.job,
        "merchant" => &tx.merchant,
        "category" => &tx.category,
        "zip" => &tx.zip,
        _ => return None,
    };
    value.as_deref()
}

/// Card numbers are digit strings that fit in 64 bits
fn parse_card_number(raw: &str) -> Result<f64, ScoringError> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScoringError::invalid_input(
            "cc_num",
            format!("expected digits only, got {:?}", raw),
        ));
    }
    digits
        .parse::<u64>()
        .map(|n| n as f64)
        .map_err(|e| ScoringError::invalid_input("cc_num", e.to_string()))
}

fn check_amount(amt: f64) -> Result<f64, ScoringError> {
    if !amt.is_finite() || amt < 0.0 {
        return Err(ScoringError::invalid_input(
            "amt",
            format!("expected a non-negative amount, got {}", amt),
        ));
    }
    Ok(amt)
}

fn check_finite(column: &str, value: f64) -> Result<f64, ScoringError> {
    if !value.is_finite() {
        return Err(ScoringError::invalid_input(column, "value is not finite"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::parse_timestamp;
    use chrono::NaiveDate;

    /// Columns that must never reach the model
    const DROPPED_COLUMNS: [&str; 8] = [
        "trans_num",
        "unix_time",
        "Unnamed: 0",
        "first",
        "last",
        "street",
        "gender",
        "dob",
    ];

    fn freq_maps() -> Arc<FrequencyMaps> {
        let mut columns = HashMap::new();
        columns.insert(
            "category".to_string(),
            HashMap::from([("grocery_pos".to_string(), 0.003)]),
        );
        columns.insert(
            "state".to_string(),
            HashMap::from([("New York".to_string(), 0.064)]),
        );
        columns.insert(
            "zip".to_string(),
            HashMap::from([("10001".to_string(), 0.0002)]),
        );
        Arc::new(FrequencyMaps::new(columns))
    }

    fn scenario_record() -> RawTransactionRecord {
        let mut tx = RawTransactionRecord::new(
            parse_timestamp("2024-06-15T14:30:00").unwrap(),
            "1234567890123456",
            100.0,
            NaiveDate::from_ymd_opt(2004, 9, 9).unwrap(),
        );
        tx.city_pop = Some(1_000_000);
        tx.lat = Some(40.7128);
        tx.long = Some(-74.0060);
        tx.merch_lat = Some(40.7128);
        tx.merch_long = Some(-74.0060);
        tx.gender = Some("F".to_string());
        tx.category = Some("grocery_pos".to_string());
        tx
    }

    #[test]
    fn test_scenario_features() {
        let encoder = FeatureEncoder::new(freq_maps());
        let features = encoder.encode(&scenario_record()).unwrap();

        assert_eq!(features.get("hour"), Some(14.0));
        assert_eq!(features.get("day"), Some(15.0));
        // 2024-06-15 is a Saturday
        assert_eq!(features.get("weekday"), Some(5.0));
        assert_eq!(features.get("month"), Some(6.0));
        assert_eq!(features.get("age"), Some(20.0));
        assert_eq!(features.get("gender_M"), Some(0.0));
        assert_eq!(features.get("category_encoded"), Some(0.003));
        assert_eq!(features.get("amt"), Some(100.0));
        assert_eq!(features.get("city_pop"), Some(1_000_000.0));
        assert_eq!(features.get("long"), Some(-74.0060));
        assert_eq!(features.get("cc_num"), Some(1234567890123456.0));
    }

    #[test]
    fn test_weekday_starts_monday() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();

        tx.trans_date_trans_time = parse_timestamp("2024-06-17 09:00:00").unwrap();
        assert_eq!(encoder.encode(&tx).unwrap().get("weekday"), Some(0.0));

        tx.trans_date_trans_time = parse_timestamp("2024-06-16 09:00:00").unwrap();
        assert_eq!(encoder.encode(&tx).unwrap().get("weekday"), Some(6.0));
    }

    #[test]
    fn test_age_is_year_difference() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();
        // Birthday later in the year still counts the full year difference
        tx.trans_date_trans_time = parse_timestamp("2024-01-01 00:00:00").unwrap();
        tx.dob = NaiveDate::from_ymd_opt(2004, 12, 31).unwrap();
        assert_eq!(encoder.encode(&tx).unwrap().get("age"), Some(20.0));
    }

    #[test]
    fn test_gender_encoding() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();

        for (gender, expected) in [
            (Some("M"), 1.0),
            (Some("F"), 0.0),
            (Some("m"), 0.0),
            (Some("X"), 0.0),
            (None, 0.0),
        ] {
            tx.gender = gender.map(str::to_string);
            assert_eq!(encoder.encode(&tx).unwrap().get("gender_M"), Some(expected));
        }
    }

    #[test]
    fn test_unseen_categories_encode_to_zero() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();
        tx.category = Some("space_travel".to_string());
        tx.state = Some("Atlantis".to_string());
        tx.city = Some("Nowhere".to_string());
        tx.job = Some("Astronaut".to_string());
        tx.merchant = Some("fraud_Unknown".to_string());
        tx.zip = Some("00000".to_string());

        let features = encoder.encode(&tx).unwrap();
        for column in ENCODED_COLUMNS {
            assert_eq!(features.get(&encoded_column(column)), Some(0.0), "{}", column);
        }
    }

    #[test]
    fn test_known_categories_encode_to_frequency() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();
        tx.state = Some("New York".to_string());
        tx.zip = Some("10001".to_string());

        let features = encoder.encode(&tx).unwrap();
        assert_eq!(features.get("state_encoded"), Some(0.064));
        assert_eq!(features.get("zip_encoded"), Some(0.0002));
        // Absent categoricals produce no column
        assert_eq!(features.get("city_encoded"), None);
    }

    #[test]
    fn test_identifiers_and_raw_fields_dropped() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();
        tx.first = Some("Shivangi".to_string());
        tx.last = Some("Patwa".to_string());
        tx.street = Some("123 Main St".to_string());
        tx.trans_num = Some("0b242abb623afc578575680df30655b9".to_string());
        tx.unix_time = Some(1_325_376_018);
        tx.row_index = Some(0);
        tx.category = Some("grocery_pos".to_string());

        let features = encoder.encode(&tx).unwrap();
        let names = encoder.feature_names();
        for column in features.columns() {
            assert!(!DROPPED_COLUMNS.contains(&column), "{} leaked", column);
            assert!(names.iter().any(|n| n == column), "{} not declared", column);
        }
        // Raw categorical column replaced by its encoding
        assert_eq!(features.get("category"), None);
    }

    #[test]
    fn test_invalid_card_number() {
        let encoder = FeatureEncoder::new(freq_maps());
        for raw in ["", "1234-5678", "abcd", "99999999999999999999999"] {
            let mut tx = scenario_record();
            tx.cc_num = raw.to_string();
            let err = encoder.encode(&tx).unwrap_err();
            assert!(
                matches!(&err, ScoringError::InvalidInput { field, .. } if field == "cc_num"),
                "{:?} accepted",
                raw
            );
        }
    }

    #[test]
    fn test_invalid_amount() {
        let encoder = FeatureEncoder::new(freq_maps());
        for amt in [-1.0, f64::NAN, f64::INFINITY] {
            let mut tx = scenario_record();
            tx.amt = amt;
            assert_eq!(encoder.encode(&tx).unwrap_err().kind(), "invalid_input");
        }
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();
        tx.merch_lat = Some(f64::NAN);
        assert_eq!(encoder.encode(&tx).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn test_birth_after_transaction_is_scored() {
        let encoder = FeatureEncoder::new(freq_maps());
        let mut tx = scenario_record();

        // Later in the same year
        tx.dob = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
        assert_eq!(encoder.encode(&tx).unwrap().get("age"), Some(0.0));

        tx.dob = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(encoder.encode(&tx).unwrap().get("age"), Some(-6.0));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = FeatureEncoder::new(freq_maps());
        let tx = scenario_record();
        assert_eq!(encoder.encode(&tx).unwrap(), encoder.encode(&tx).unwrap());
    }

    #[test]
    fn test_feature_names() {
        let encoder = FeatureEncoder::new(freq_maps());
        let names = encoder.feature_names();
        assert_eq!(names.len(), 19);
        assert!(names.contains(&"zip_encoded".to_string()));
    }
}
