//! Card Fraud Scorer - Main Entry Point
//!
//! Consumes scoring requests from NATS, scores each transaction with the
//! requested model, and replies with a verdict or a rejection.
//! Requests are scored in parallel on blocking workers.

use anyhow::{Context, Result};
use card_fraud_scorer::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, ScoringRequestConsumer},
    error::ScoringError,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::ScoringPipeline,
    producer::VerdictProducer,
    types::ScoringResponse,
    ArtifactStore,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("card_fraud_scorer={}", config.level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format.as_str() {
        "pretty" => builder.pretty().init(),
        _ => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Card Fraud Scorer");
    info!(
        default_model = %config.scoring.default_model,
        workers = config.pipeline.workers,
        timeout_ms = config.pipeline.timeout_ms,
        "Configuration loaded"
    );

    // Missing or malformed artifacts end the process
    let artifacts = ArtifactStore::global(&config.artifacts).context("Failed to load artifacts")?;
    if artifacts.dispatcher().get(&config.scoring.default_model).is_none() {
        anyhow::bail!(
            "Default model `{}` is not among the loaded models {:?}",
            config.scoring.default_model,
            artifacts.dispatcher().model_names()
        );
    }

    let metrics = Arc::new(PipelineMetrics::new());
    let pipeline = Arc::new(ScoringPipeline::new(artifacts).with_metrics(metrics.clone()));

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!(url = %config.nats.url, "Connected to NATS");

    let consumer = ScoringRequestConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(VerdictProducer::new(client.clone(), &config.nats.verdict_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        verdicts = %producer.subject(),
        "Starting request processing loop"
    );

    // Semaphore to limit concurrent scoring
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let timeout = Duration::from_millis(config.pipeline.timeout_ms);
    let default_model: Arc<str> = Arc::from(config.scoring.default_model.as_str());

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        };

        let permit = semaphore.clone().acquire_owned().await?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let default_model = default_model.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let response = match decode_request(&message.payload) {
                Ok(mut request) => {
                    let request_id = request
                        .request_id
                        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                        .clone();
                    let model = request
                        .model
                        .clone()
                        .unwrap_or_else(|| default_model.to_string());

                    let worker = tokio::task::spawn_blocking(move || {
                        pipeline.handle(&request, &default_model)
                    });

                    match tokio::time::timeout(timeout, worker).await {
                        Ok(Ok(response)) => response,
                        Ok(Err(e)) => {
                            let err = ScoringError::InferenceFailure {
                                model,
                                reason: format!("scoring worker failed: {}", e),
                            };
                            metrics.record_rejection(err.kind());
                            ScoringResponse::from_result(request_id, &Err(err))
                        }
                        Err(_) => {
                            // The worker still records its own outcome when it finishes
                            let err = ScoringError::InferenceFailure {
                                model,
                                reason: format!("timed out after {} ms", timeout.as_millis()),
                            };
                            ScoringResponse::from_result(request_id, &Err(err))
                        }
                    }
                }
                Err(e) => {
                    metrics.record_rejection(e.kind());
                    ScoringResponse::from_result(uuid::Uuid::new_v4().to_string(), &Err(e))
                }
            };

            let processing_time = start_time.elapsed();
            match &response.verdict {
                Some(verdict) if verdict.is_fraud() => info!(
                    request_id = %response.request_id,
                    model = %verdict.model,
                    probability = verdict.probability,
                    processing_time_us = processing_time.as_micros(),
                    "Fraud detected"
                ),
                Some(verdict) => debug!(
                    request_id = %response.request_id,
                    model = %verdict.model,
                    probability = verdict.probability,
                    processing_time_us = processing_time.as_micros(),
                    "Transaction legitimate"
                ),
                None => {}
            }

            if let Err(e) = producer.respond(message.reply.clone(), &response).await {
                error!(
                    request_id = %response.request_id,
                    error = %e,
                    "Failed to publish scoring response"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    // Wait for in-flight requests
    let _drained = semaphore.acquire_many(num_workers as u32).await?;
    if let Err(e) = client.flush().await {
        error!(error = %e, "Failed to flush NATS client");
    }

    info!("Scorer shutting down...");
    metrics.print_summary();

    Ok(())
}
