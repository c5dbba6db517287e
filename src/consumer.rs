//! NATS consumer for incoming scoring requests

use crate::error::ScoringError;
use crate::types::verdict::ScoringRequest;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving scoring requests from NATS
pub struct ScoringRequestConsumer {
    client: Client,
    subject: String,
}

impl ScoringRequestConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to request subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload; malformed payloads are invalid input
pub fn decode_request(payload: &[u8]) -> Result<ScoringRequest, ScoringError> {
    serde_json::from_slice(payload)
        .map_err(|e| ScoringError::invalid_input("request", e.to_string()))
}
