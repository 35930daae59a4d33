//! The concurrent ingestion pipeline.

use std::sync::Arc;

use futures::{StreamExt as _, stream};
use serde_json::Value;
use squadron_core::{record::FieldPolicy, store::CharacterStore};
use squadron_enrich::{AiConfig, AiServices};

use crate::{
  Result,
  reconcile::reconcile,
  source::Source,
  steps::{Steps, no_steps, standard_steps},
};

/// Progress is logged after this many completed records.
const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct IngestOptions {
  /// Upper bound on records processed at once. Clamped to at least 1.
  pub max_workers:  usize,
  /// Only ingest the first `limit` records of the dataset.
  pub limit:        Option<usize>,
  /// Skip every enrichment step.
  pub skip_ai:      bool,
  pub field_policy: FieldPolicy,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self { max_workers: 8, limit: None, skip_ai: false, field_policy: FieldPolicy::default() }
  }
}

/// A record that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
  /// The record's `name`, or `unknown`.
  pub name:  String,
  pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
  pub total:    usize,
  pub created:  usize,
  pub updated:  usize,
  pub failures: Vec<RecordFailure>,
}

impl IngestReport {
  pub fn processed(&self) -> usize { self.created + self.updated + self.failures.len() }
}

/// Fetch the dataset and ingest it.
///
/// Only a failed fetch is an error. Enrichment is disabled when `skip_ai` is
/// set, when no API key is configured, or when the adapters cannot be built.
pub async fn run<S>(
  store: Arc<S>,
  source: &Source,
  ai: &AiConfig,
  options: &IngestOptions,
) -> Result<IngestReport>
where
  S: CharacterStore + 'static,
{
  tracing::info!(url = %source.url, "fetching dataset");
  let mut records = source.fetch().await?;
  if let Some(limit) = options.limit {
    records.truncate(limit);
  }
  tracing::info!(records = records.len(), "dataset fetched");

  let steps = if options.skip_ai {
    tracing::info!("AI enrichment skipped");
    no_steps()
  } else {
    match AiServices::from_config(ai) {
      Ok(Some(services)) => standard_steps(&services),
      Ok(None) => {
        tracing::warn!("no AI API key configured; continuing without enrichment");
        no_steps()
      }
      Err(e) => {
        tracing::warn!(error = %e, "could not initialise AI services; continuing without enrichment");
        no_steps()
      }
    }
  };

  Ok(process_records(store, steps, records, options).await)
}

/// Reconcile every record, at most `max_workers` at a time.
///
/// Each record runs on its own task; results are consumed in completion
/// order. A failing or panicking record is logged and recorded in the report
/// without affecting the others.
pub async fn process_records<S>(
  store: Arc<S>,
  steps: Steps,
  records: Vec<Value>,
  options: &IngestOptions,
) -> IngestReport
where
  S: CharacterStore + 'static,
{
  let max_workers = options.max_workers.max(1);
  let policy = options.field_policy;
  let mut report = IngestReport { total: records.len(), ..IngestReport::default() };

  tracing::info!(total = report.total, max_workers, "processing records");

  let mut results = stream::iter(records.into_iter().map(|payload| {
    let store = store.clone();
    let steps = steps.clone();
    let name = record_name(&payload);
    async move {
      let task =
        tokio::spawn(async move { reconcile(store.as_ref(), &steps, &payload, policy).await });
      (name, task.await)
    }
  }))
  .buffer_unordered(max_workers);

  while let Some((name, joined)) = results.next().await {
    let error = match joined {
      Ok(Ok(outcome)) => {
        if outcome.created {
          report.created += 1;
        } else {
          report.updated += 1;
        }
        None
      }
      Ok(Err(e)) => Some(e.to_string()),
      Err(e) => Some(format!("task failed: {e}")),
    };

    if let Some(error) = error {
      tracing::error!(character = %name, %error, "failed to ingest record");
      report.failures.push(RecordFailure { name, error });
    }

    let processed = report.processed();
    if processed % PROGRESS_EVERY == 0 || processed == report.total {
      tracing::info!(processed, total = report.total, "ingestion progress");
    }
  }

  tracing::info!(
    total = report.total,
    created = report.created,
    updated = report.updated,
    failed = report.failures.len(),
    "ingestion finished"
  );
  report
}

fn record_name(payload: &Value) -> String {
  payload
    .get("name")
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .unwrap_or("unknown")
    .to_owned()
}
