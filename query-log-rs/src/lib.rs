// query-log-rs/src/lib.rs
// Outcome logger: durable, append-only record of every analyst query.
//
// Implementation notes:
// - One QueryLogRecord per query, inserted into a document store collection.
// - Writes fail closed: a persistence error is logged and swallowed so that
//   logging never aborts a user-facing response.
// - The training report is read-only analytics over the same collection.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::instrument;

use document_store::{Accumulator, DocumentStore, GroupKey, Stage, StoreError};
use shared_types_rs::{Plan, QueryLogRecord};

mod summary;

pub use summary::{AverageTimings, OutcomeCount, TrainingSummary};

pub struct OutcomeLogger {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl OutcomeLogger {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Persist one record. Never fails; errors go to the operational log.
    #[instrument(skip(self, record), fields(session = %record.session_id, outcome = %record.outcome))]
    pub async fn record(&self, mut record: QueryLogRecord) {
        if record.plan_hash.is_none() {
            record.plan_hash = record.plan.as_ref().map(plan_hash);
        }

        let document = match serde_json::to_value(&record) {
            Ok(Value::Object(document)) => document,
            Ok(other) => {
                log::error!("Query log record serialized to a non-object: {}", other);
                return;
            }
            Err(e) => {
                log::error!("Failed to serialize query log record: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.insert(&self.collection, document).await {
            log::error!(
                "Failed to persist query log record to '{}': {}. Record: {}",
                self.collection,
                e,
                serde_json::to_string(&record).unwrap_or_default()
            );
        }
    }

    /// Outcome counts and averaged durations over the whole log.
    pub async fn summarize(&self) -> Result<TrainingSummary, StoreError> {
        let timing_accumulators = |prefix: &str| {
            vec![
                (format!("{}total", prefix), Accumulator::Avg("total_duration".to_string())),
                (format!("{}planner", prefix), Accumulator::Avg("planner_duration".to_string())),
                (format!("{}retrieval", prefix), Accumulator::Avg("retrieval_duration".to_string())),
                (format!("{}synth", prefix), Accumulator::Avg("synth_duration".to_string())),
            ]
        };

        let mut per_outcome = vec![("count".to_string(), Accumulator::Count)];
        per_outcome.extend(timing_accumulators("avg_"));

        let by_outcome = self
            .store
            .aggregate(
                &self.collection,
                &[
                    Stage::Group {
                        key: GroupKey::Field("outcome".to_string()),
                        accumulators: per_outcome,
                    },
                    Stage::Sort {
                        field: "count".to_string(),
                        descending: true,
                    },
                ],
            )
            .await?;

        let overall = self
            .store
            .aggregate(
                &self.collection,
                &[Stage::Group {
                    key: GroupKey::Constant,
                    accumulators: timing_accumulators("avg_"),
                }],
            )
            .await?;

        Ok(TrainingSummary::from_groups(&by_outcome, overall.first()))
    }

    /// Most recent record, if any.
    pub async fn latest(&self) -> Result<Option<QueryLogRecord>, StoreError> {
        let newest = self
            .store
            .aggregate(
                &self.collection,
                &[
                    Stage::Sort {
                        field: "timestamp".to_string(),
                        descending: true,
                    },
                    Stage::Limit(1),
                ],
            )
            .await?;

        match newest.into_iter().next() {
            Some(document) => Ok(Some(serde_json::from_value(Value::Object(document))?)),
            None => Ok(None),
        }
    }
}

/// Hex SHA-256 of the plan's canonical JSON (keys sorted).
pub fn plan_hash(plan: &Plan) -> String {
    let canonical = serde_json::to_value(plan)
        .map(|v| v.to_string())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
