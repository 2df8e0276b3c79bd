//! Batch Ingestion
//!
//! Scores and persists a sequence of anomalies as one import. Records are
//! isolated from each other: a persistence failure is itemized in the result
//! and never stops later records, and a missing batch table only means the
//! records are stored without a batch reference.

mod ingestor;
mod outcome;

pub use ingestor::{BatchIngestor, IngestConfig};
pub use outcome::{summarize_failures, BatchResult, RecordFailure, RecordOutcome};
