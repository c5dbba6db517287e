//! Single-request scoring: encode, assemble, infer

use crate::artifacts::ArtifactStore;
use crate::assembler::VectorAssembler;
use crate::error::ScoringError;
use crate::feature_encoder::FeatureEncoder;
use crate::metrics::PipelineMetrics;
use crate::types::record::RawTransactionRecord;
use crate::types::verdict::{ScoringRequest, ScoringResponse, Verdict};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Scores transactions against the shared artifacts.
///
/// Holds no per-request state, so one instance serves every worker.
pub struct ScoringPipeline {
    artifacts: Arc<ArtifactStore>,
    encoder: FeatureEncoder,
    assembler: VectorAssembler,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl ScoringPipeline {
    pub fn new(artifacts: Arc<ArtifactStore>) -> Self {
        let encoder = FeatureEncoder::new(Arc::clone(artifacts.freq_maps()));
        let assembler = VectorAssembler::new(Arc::clone(artifacts.scaler()));
        Self {
            artifacts,
            encoder,
            assembler,
            metrics: None,
        }
    }

    /// Record every outcome in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn artifacts(&self) -> &Arc<ArtifactStore> {
        &self.artifacts
    }

    /// Score one record with the named model
    pub fn score(
        &self,
        record: &RawTransactionRecord,
        model: &str,
    ) -> Result<Verdict, ScoringError> {
        let start = Instant::now();
        let result = self.run(record, model);

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(verdict) => metrics.record_verdict(start.elapsed(), verdict),
                Err(e) => metrics.record_rejection(e.kind()),
            }
        }

        result
    }

    fn run(&self, record: &RawTransactionRecord, model: &str) -> Result<Verdict, ScoringError> {
        let features = self.encoder.encode(record)?;
        let vector = self.assembler.assemble(&features);

        let infer_start = Instant::now();
        let verdict = self.artifacts.dispatcher().infer(model, &vector)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_model_time(model, infer_start.elapsed());
        }

        debug!(
            model = %model,
            features = features.len(),
            label = ?verdict.label,
            probability = verdict.probability,
            "Transaction scored"
        );
        Ok(verdict)
    }

    /// Score a bus request, falling back to `default_model` when it names none
    pub fn handle(&self, request: &ScoringRequest, default_model: &str) -> ScoringResponse {
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let model = request.model.as_deref().unwrap_or(default_model);

        let result = self.score(&request.record, model);
        if let Err(e) = &result {
            warn!(
                request_id = %request_id,
                kind = e.kind(),
                error = %e,
                "Request rejected"
            );
        }

        ScoringResponse::from_result(request_id, &result)
    }
}
