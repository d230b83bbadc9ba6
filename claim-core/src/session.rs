use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ClaimError, Result};
use crate::models::{ClaimDraft, ClaimRecord, ClaimSummary, Classification};
use crate::storage::StoragePort;

/// Key of the single-slot store holding the most recent submission
pub const CURRENT_CLAIM_KEY: &str = "currentClaim";
/// Key of the append-only historical claim list
pub const CLAIM_HISTORY_KEY: &str = "claims";

/// Hands a single in-progress claim across the review flow (upload →
/// results → assistant) and accumulates the historical claim list.
///
/// Two storage ports back it: an ephemeral one whose `currentClaim` slot is
/// overwritten on every submission, and a durable one whose `claims` list
/// only ever grows. Malformed persisted blobs are treated as empty rather
/// than propagated.
pub struct ClaimSession {
    ephemeral: Arc<dyn StoragePort>,
    durable: Arc<dyn StoragePort>,
}

impl ClaimSession {
    pub fn new(ephemeral: Arc<dyn StoragePort>, durable: Arc<dyn StoragePort>) -> Self {
        Self { ephemeral, durable }
    }

    /// Build the complete claim record for a submission, overwrite the
    /// ephemeral slot with it and prepend it to the durable history.
    pub async fn record_submission(
        &self,
        draft: ClaimDraft,
        extracted_text: String,
        classification: Classification,
    ) -> Result<ClaimRecord> {
        let now = Utc::now().to_rfc3339();
        let record = ClaimRecord {
            id: format!("CLM-{}", Uuid::new_v4()),
            patient_name: draft.patient_name,
            patient_age: draft.patient_age,
            claim_amount: draft.claim_amount,
            claim_description: draft.claim_description,
            file_name: draft.file.name,
            file_size: draft.file.size,
            extracted_text,
            is_fraud: classification.is_fraud,
            confidence_score: classification.confidence_score,
            reasons: classification.reasons,
            suggested_actions: classification.suggested_actions,
            date: now.clone(),
            submitted_at: now,
        };

        let blob = serialize(&record)?;
        self.ephemeral.set(CURRENT_CLAIM_KEY, blob).await?;

        let mut history = self.read_history().await?;
        history.insert(0, record.clone());
        self.durable
            .set(CLAIM_HISTORY_KEY, serialize(&history)?)
            .await?;

        info!(
            claim_id = %record.id,
            is_fraud = record.is_fraud,
            confidence = record.confidence_score,
            "Recorded claim submission"
        );

        Ok(record)
    }

    /// Read the ephemeral slot. `None` is a normal outcome (nothing has been
    /// submitted, the session ended, or the stored blob was unreadable) and
    /// callers are expected to route the operator back to the submission
    /// entry point.
    pub async fn load_current(&self) -> Result<Option<ClaimRecord>> {
        let Some(blob) = self.ephemeral.get(CURRENT_CLAIM_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&blob) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(error = %e, "Current claim slot is corrupted, treating as absent");
                Ok(None)
            }
        }
    }

    /// Return up to `limit` historical claims, most recent submission first,
    /// reduced to their dashboard display fields.
    pub async fn load_history(&self, limit: usize) -> Result<Vec<ClaimSummary>> {
        let history = self.read_history().await?;
        Ok(history
            .into_iter()
            .take(limit)
            .map(summarize)
            .collect())
    }

    async fn read_history(&self) -> Result<Vec<ClaimRecord>> {
        let Some(blob) = self.durable.get(CLAIM_HISTORY_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&blob) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(error = %e, "Claim history is corrupted, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ClaimError::Storage(e.to_string()))
}

fn summarize(record: ClaimRecord) -> ClaimSummary {
    ClaimSummary {
        date: display_date(&record.submitted_at),
        id: record.id,
        patient_name: record.patient_name,
        amount: record.claim_amount,
        is_fraud: record.is_fraud,
        reason: record.reasons.first().cloned(),
    }
}

/// Synthesize a displayable date ("May 14, 2025") from the stored RFC 3339
/// timestamp, falling back to the raw value if it does not parse.
fn display_date(submitted_at: &str) -> String {
    DateTime::parse_from_rfc3339(submitted_at)
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| submitted_at.to_string())
}
