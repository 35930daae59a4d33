//! Ingestion of the external character dataset.
//!
//! The dataset is fetched once, then every record is reconciled on its own
//! task: mapped into a typed record, enriched by an ordered list of
//! [`steps::EnrichmentStep`]s, and committed together with its master diff in
//! a single transaction. A failing record never stops the batch.

pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod source;
pub mod steps;

pub use error::{Error, Result};
pub use pipeline::{IngestOptions, IngestReport, RecordFailure, process_records, run};
pub use reconcile::{ReconcileOutcome, reconcile};
pub use source::{Source, fetch_dataset};
pub use steps::{EnrichmentStep, Steps, standard_steps};
