//! Performance metrics and statistics tracking for the scoring service.

use crate::types::verdict::Verdict;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

const PROCESSING_WINDOW: usize = 10_000;
const MODEL_WINDOW: usize = 1_000;

/// Metrics collector for the scoring pipeline
pub struct PipelineMetrics {
    /// Requests that produced a verdict
    pub requests_scored: AtomicU64,
    /// Verdicts labelled fraud
    pub fraud_verdicts: AtomicU64,
    /// Rejected requests by error kind
    rejections_by_kind: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Model inference times (in microseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Fraud probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_scored: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            rejections_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            model_times: RwLock::new(HashMap::new()),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored request
    pub fn record_verdict(&self, processing_time: Duration, verdict: &Verdict) {
        self.requests_scored.fetch_add(1, Ordering::Relaxed);
        if verdict.is_fraud() {
            self.fraud_verdicts.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > PROCESSING_WINDOW {
                times.drain(0..PROCESSING_WINDOW / 2);
            }
        }

        let bucket = (verdict.probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a rejected request
    pub fn record_rejection(&self, kind: &str) {
        if let Ok(mut by_kind) = self.rejections_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Record model inference time
    pub fn record_model_time(&self, model_name: &str, duration: Duration) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_default();
            model_times.push(duration.as_micros() as u64);
            if model_times.len() > MODEL_WINDOW {
                model_times.drain(0..MODEL_WINDOW / 2);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get per-model inference stats
    pub fn get_model_stats(&self) -> HashMap<String, ModelStats> {
        let mut stats = HashMap::new();
        let Ok(times) = self.model_times.read() else {
            return stats;
        };

        for (model, model_times) in times.iter().filter(|(_, t)| !t.is_empty()) {
            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let count = sorted.len();
            stats.insert(
                model.clone(),
                ModelStats {
                    calls: count as u64,
                    mean_us: sorted.iter().sum::<u64>() / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[(count as f64 * 0.99) as usize],
                },
            );
        }

        stats
    }

    /// Get current throughput (requests scored per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get fraud probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Get rejections by error kind
    pub fn get_rejections_by_kind(&self) -> HashMap<String, u64> {
        self.rejections_by_kind
            .read()
            .map(|by_kind| by_kind.clone())
            .unwrap_or_default()
    }

    /// Total rejected requests
    pub fn rejected_count(&self) -> u64 {
        self.get_rejections_by_kind().values().sum()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.requests_scored.load(Ordering::Relaxed);
        let fraud = self.fraud_verdicts.load(Ordering::Relaxed);
        let fraud_rate = if scored > 0 {
            (fraud as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let rejections = self.get_rejections_by_kind();
        let rejected: u64 = rejections.values().sum();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            CARD FRAUD SCORER - METRICS SUMMARY               ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Scored:  {:>8}  │  Throughput: {:>6.1} req/s      ║",
            scored, throughput
        );
        info!(
            "║ Fraud Verdicts:   {:>8}  │  Fraud Rate: {:>6.1}%          ║",
            fraud, fraud_rate
        );
        info!("║ Rejected:         {:>8}                                   ║", rejected);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        if !rejections.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Rejections by Kind:                                          ║");
            let mut kinds: Vec<_> = rejections.iter().collect();
            kinds.sort();
            for (kind, count) in kinds {
                info!("║   {:18}: {:>6}                                ║", kind, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                              ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let model_stats = self.get_model_stats();
        if !model_stats.is_empty() {
            info!("Model Inference Times (μs):");
            for (model, stats) in &model_stats {
                info!(
                    "  {}: mean={} p50={} p99={} (calls={})",
                    model, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
                );
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Model-specific statistics
#[derive(Debug)]
pub struct ModelStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
