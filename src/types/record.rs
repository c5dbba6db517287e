//! Raw transaction record as submitted for scoring

use crate::error::ScoringError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// The 50 US states by name, as offered by the entry form
pub const US_STATES: [&str; 50] = [
    "Alabama", "Alaska", "Arizona", "Arkansas", "California", "Colorado", "Connecticut",
    "Delaware", "Florida", "Georgia", "Hawaii", "Idaho", "Illinois", "Indiana", "Iowa",
    "Kansas", "Kentucky", "Louisiana", "Maine", "Maryland", "Massachusetts", "Michigan",
    "Minnesota", "Mississippi", "Missouri", "Montana", "Nebraska", "Nevada", "New Hampshire",
    "New Jersey", "New Mexico", "New York", "North Carolina", "North Dakota", "Ohio",
    "Oklahoma", "Oregon", "Pennsylvania", "Rhode Island", "South Carolina", "South Dakota",
    "Tennessee", "Texas", "Utah", "Vermont", "Virginia", "Washington", "West Virginia",
    "Wisconsin", "Wyoming",
];

/// A single card transaction, field names matching the training dataset columns.
///
/// Only the timestamp, card number, amount and date of birth are required.
/// Any other field may be absent; the encoder then emits no column for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    /// Transaction date and time
    #[serde(with = "timestamp_format")]
    pub trans_date_trans_time: NaiveDateTime,

    /// Card number (numeric string)
    #[serde(deserialize_with = "string_or_number")]
    pub cc_num: String,

    /// Amount in dollars
    pub amt: f64,

    /// Customer first name (never used as a feature)
    #[serde(default)]
    pub first: Option<String>,

    /// Customer last name (never used as a feature)
    #[serde(default)]
    pub last: Option<String>,

    /// Gender, "F" or "M"
    #[serde(default)]
    pub gender: Option<String>,

    /// Date of birth
    pub dob: NaiveDate,

    /// Occupation
    #[serde(default)]
    pub job: Option<String>,

    /// Street address (never used as a feature)
    #[serde(default)]
    pub street: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    /// ZIP code; numbers are accepted and kept in decimal string form
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub zip: Option<String>,

    #[serde(default)]
    pub city_pop: Option<u64>,

    /// Customer latitude
    #[serde(default)]
    pub lat: Option<f64>,

    /// Customer longitude
    #[serde(default)]
    pub long: Option<f64>,

    /// Merchant name
    #[serde(default)]
    pub merchant: Option<String>,

    /// Merchant category
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub merch_lat: Option<f64>,

    #[serde(default)]
    pub merch_long: Option<f64>,

    /// Dataset transaction identifier, accepted and ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_num: Option<String>,

    /// Dataset epoch column, accepted and ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_time: Option<i64>,

    /// Dataset row index, accepted and ignored
    #[serde(rename = "Unnamed: 0", default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u64>,
}

impl RawTransactionRecord {
    /// Create a record with the required fields only
    pub fn new(
        trans_date_trans_time: NaiveDateTime,
        cc_num: impl Into<String>,
        amt: f64,
        dob: NaiveDate,
    ) -> Self {
        Self {
            trans_date_trans_time,
            cc_num: cc_num.into(),
            amt,
            first: None,
            last: None,
            gender: None,
            dob,
            job: None,
            street: None,
            city: None,
            state: None,
            zip: None,
            city_pop: None,
            lat: None,
            long: None,
            merchant: None,
            category: None,
            merch_lat: None,
            merch_long: None,
            trans_num: None,
            unix_time: None,
            row_index: None,
        }
    }

    /// Parse a record from JSON; malformed payloads are rejected as invalid input.
    pub fn from_json(payload: &[u8]) -> Result<Self, ScoringError> {
        serde_json::from_slice(payload)
            .map_err(|e| ScoringError::invalid_input("record", e.to_string()))
    }
}

/// Timestamp formats accepted on input, tried in order
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a transaction timestamp in any of the accepted formats
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ScoringError> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            ScoringError::invalid_input(
                "trans_date_trans_time",
                format!("unrecognised timestamp `{}`", value),
            )
        })
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Unsigned(n) => n.to_string(),
            StringOrNumber::Signed(n) => n.to_string(),
            StringOrNumber::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
