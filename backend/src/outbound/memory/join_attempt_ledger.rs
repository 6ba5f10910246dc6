//! In-memory join attempt ledger adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::ports::{JoinAttemptLedger, JoinAttemptLedgerError};
use crate::domain::rate_limit::JoinAttempt;
use crate::domain::DeviceId;

/// Append-only attempt ledger backed by process memory.
#[derive(Default)]
pub struct MemoryJoinAttemptLedger {
    attempts: Mutex<Vec<JoinAttempt>>,
}

impl MemoryJoinAttemptLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JoinAttemptLedger for MemoryJoinAttemptLedger {
    async fn append(&self, attempt: &JoinAttempt) -> Result<(), JoinAttemptLedgerError> {
        let mut attempts = self.attempts.lock().await;
        attempts.push(attempt.clone());
        Ok(())
    }

    async fn failed_attempts_since(
        &self,
        device_id: &DeviceId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, JoinAttemptLedgerError> {
        let attempts = self.attempts.lock().await;
        let mut timestamps: Vec<DateTime<Utc>> = attempts
            .iter()
            .filter(|attempt| {
                !attempt.succeeded
                    && attempt.device_id == *device_id
                    && attempt.attempted_at >= cutoff
            })
            .map(|attempt| attempt.attempted_at)
            .collect();
        timestamps.sort_unstable();
        Ok(timestamps)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, JoinAttemptLedgerError> {
        let mut attempts = self.attempts.lock().await;
        let before = attempts.len();
        attempts.retain(|attempt| attempt.attempted_at >= cutoff);
        Ok(before - attempts.len())
    }
}
