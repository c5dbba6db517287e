//! Card Fraud Scorer Library
//!
//! Real-time scoring of single card transactions: raw records are encoded
//! into engineered features, aligned and scaled to the training layout, and
//! classified by one of several pre-trained models.

pub mod artifacts;
pub mod assembler;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use artifacts::ArtifactStore;
pub use assembler::VectorAssembler;
pub use config::AppConfig;
pub use consumer::ScoringRequestConsumer;
pub use error::ScoringError;
pub use feature_encoder::{EngineeredFeatures, FeatureEncoder};
pub use models::InferenceDispatcher;
pub use pipeline::ScoringPipeline;
pub use producer::VerdictProducer;
pub use types::{RawTransactionRecord, ScoringRequest, ScoringResponse, Verdict};
