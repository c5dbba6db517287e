//! Scoring verdicts and the messages that carry them

use crate::error::ScoringError;
use crate::types::record::RawTransactionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class marker the classifiers use for fraud
pub const FRAUD_CLASS: i64 = 1;

/// Binary outcome of a scoring request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Fraud,
    Legitimate,
}

impl Label {
    /// Map a discrete classifier output onto a label
    pub fn from_class(class: i64) -> Self {
        if class == FRAUD_CLASS {
            Label::Fraud
        } else {
            Label::Legitimate
        }
    }
}

/// Result of scoring one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,

    /// Probability assigned to the fraud class (0.0 - 1.0)
    pub probability: f64,

    /// Model that produced the verdict
    pub model: String,
}

impl Verdict {
    pub fn is_fraud(&self) -> bool {
        self.label == Label::Fraud
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headline = match self.label {
            Label::Fraud => "Fraud Detected",
            Label::Legitimate => "Legitimate Transaction",
        };
        write!(
            f,
            "{} (Fraud Probability: {:.2}%)",
            headline,
            self.probability * 100.0
        )
    }
}

/// A scoring request as received from the message bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Caller-chosen correlation id; generated when absent
    #[serde(default)]
    pub request_id: Option<String>,

    /// Model name; the configured default when absent
    #[serde(default)]
    pub model: Option<String>,

    pub record: RawTransactionRecord,
}

/// Error details returned for a rejected request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&ScoringError> for ErrorBody {
    fn from(err: &ScoringError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Reply to a scoring request: a verdict or the reason it was rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResponse {
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ScoringResponse {
    pub fn from_result(request_id: String, result: &Result<Verdict, ScoringError>) -> Self {
        match result {
            Ok(verdict) => Self {
                request_id,
                verdict: Some(verdict.clone()),
                error: None,
            },
            Err(err) => Self {
                request_id,
                verdict: None,
                error: Some(ErrorBody::from(err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_class() {
        assert_eq!(Label::from_class(1), Label::Fraud);
        assert_eq!(Label::from_class(0), Label::Legitimate);
        assert_eq!(Label::from_class(2), Label::Legitimate);
    }

    #[test]
    fn test_verdict_display() {
        let verdict = Verdict {
            label: Label::Fraud,
            probability: 0.8734,
            model: "Decision Tree".to_string(),
        };
        assert_eq!(
            verdict.to_string(),
            "Fraud Detected (Fraud Probability: 87.34%)"
        );

        let verdict = Verdict {
            label: Label::Legitimate,
            probability: 0.0312,
            model: "Logistic Regression".to_string(),
        };
        assert_eq!(
            verdict.to_string(),
            "Legitimate Transaction (Fraud Probability: 3.12%)"
        );
    }

    #[test]
    fn test_response_carries_error_kind() {
        let result: Result<Verdict, ScoringError> =
            Err(ScoringError::UnknownModel("Random Forest".to_string()));
        let response = ScoringResponse::from_result("req_1".to_string(), &result);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["kind"], "unknown_model");
        assert!(json.get("verdict").is_none());
    }

    #[test]
    fn test_request_defaults() {
        let payload = br#"{"record": {
            "trans_date_trans_time": "2024-06-15 14:30:00",
            "cc_num": "1234567890123456",
            "amt": 100.0,
            "dob": "2004-09-09"
        }}"#;
        let request: ScoringRequest = serde_json::from_slice(payload).unwrap();
        assert!(request.request_id.is_none());
        assert!(request.model.is_none());
    }
}
