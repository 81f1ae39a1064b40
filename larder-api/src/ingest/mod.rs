//! Ingestion pipeline
//!
//! Reconciles the upstream slug set against storage and drives per-slug
//! fetch → parse → persist, including the negative cache of slugs that
//! previously failed.

pub mod orchestrator;
pub mod reconcile;

pub use orchestrator::{BatchOutcome, IngestError, Ingestor};
pub use reconcile::{reconcile, Reconciliation};
