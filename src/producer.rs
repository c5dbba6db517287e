//! NATS producer for scoring responses

use crate::types::verdict::ScoringResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes responses to the requester's reply subject or the verdict subject
#[derive(Clone)]
pub struct VerdictProducer {
    client: Client,
    subject: String,
}

impl VerdictProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Send a response, preferring `reply` when the request carried one
    pub async fn respond(&self, reply: Option<Subject>, response: &ScoringResponse) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let target = reply.unwrap_or_else(|| Subject::from(self.subject.as_str()));

        self.client.publish(target.clone(), payload.into()).await?;

        debug!(
            request_id = %response.request_id,
            subject = %target,
            rejected = response.error.is_some(),
            "Published scoring response"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
