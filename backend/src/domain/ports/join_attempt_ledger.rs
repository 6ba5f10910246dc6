//! Driven port for the append-only join attempt ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::rate_limit::JoinAttempt;
use crate::domain::DeviceId;

/// Errors raised by join attempt ledger adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinAttemptLedgerError {
    /// Ledger connection could not be established.
    #[error("join attempt ledger connection failed: {message}")]
    Connection { message: String },
    /// Read or append failed during execution.
    #[error("join attempt ledger operation failed: {message}")]
    Query { message: String },
}

impl JoinAttemptLedgerError {
    /// Construct a [`JoinAttemptLedgerError::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Construct a [`JoinAttemptLedgerError::Query`].
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Port for appending attempts and reading the sliding window.
///
/// Rows are append-only: the limiter never mutates history, and pruning
/// aged rows is an adapter maintenance task rather than a correctness
/// requirement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JoinAttemptLedger: Send + Sync {
    /// Append one attempt row after its outcome is known.
    async fn append(&self, attempt: &JoinAttempt) -> Result<(), JoinAttemptLedgerError>;

    /// Timestamps of failed attempts for the device at or after `cutoff`,
    /// in ascending order.
    async fn failed_attempts_since(
        &self,
        device_id: &DeviceId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, JoinAttemptLedgerError>;

    /// Drop rows older than `cutoff`; returns the number removed.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, JoinAttemptLedgerError>;
}
