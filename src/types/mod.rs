//! Type definitions for the scoring pipeline

pub mod record;
pub mod verdict;

pub use record::RawTransactionRecord;
pub use verdict::{Label, ScoringRequest, ScoringResponse, Verdict};
