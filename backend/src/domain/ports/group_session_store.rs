//! Driven port for group-order session persistence.
//!
//! The store owns the unit of mutual exclusion for membership changes: each
//! compound operation below runs under the session's row lock, so the
//! capacity check and the participant insert (for example) are one atomic
//! step no matter how many devices race.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    CartItem, DeviceId, GroupSession, Participant, ParticipantDraft, ParticipantId, SessionCode,
};

/// Errors raised by session store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupSessionStoreError {
    /// Store connection could not be established.
    #[error("group session store connection failed: {message}")]
    Connection { message: String },
    /// Operation failed during execution.
    #[error("group session store operation failed: {message}")]
    Query { message: String },
    /// The code is already held by another live session.
    #[error("join code {code} is already in use")]
    CodeTaken { code: String },
}

impl GroupSessionStoreError {
    /// Construct a [`GroupSessionStoreError::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Construct a [`GroupSessionStoreError::Query`].
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Construct a [`GroupSessionStoreError::CodeTaken`].
    pub fn code_taken(code: impl Into<String>) -> Self {
        Self::CodeTaken { code: code.into() }
    }
}

/// Outcome of the atomic admit operation.
#[derive(Debug, Clone)]
pub enum AdmitParticipantOutcome {
    /// No live session holds the code.
    SessionNotFound,
    /// The device is attached; `reconnection` is true when it already
    /// participated and no new record was created.
    Admitted {
        session: GroupSession,
        participant_id: ParticipantId,
        reconnection: bool,
    },
    /// The participant limit is reached.
    Full,
}

/// Outcome of the atomic guest removal operation.
#[derive(Debug, Clone)]
pub enum RemoveGuestOutcome {
    /// No live session holds the code.
    SessionNotFound,
    /// The guest was detached; the removed record is returned for logging.
    Removed {
        session: GroupSession,
        participant: Participant,
    },
    /// The target is the host and cannot be removed.
    IsHost,
    /// No participant with the id is attached.
    ParticipantNotFound,
}

/// Outcome of the atomic cart replacement operation.
#[derive(Debug, Clone)]
pub enum ReplaceCartOutcome {
    /// No live session holds the code.
    SessionNotFound,
    /// The cart was replaced and the subtotal recomputed.
    Updated {
        session: GroupSession,
        participant_id: ParticipantId,
    },
    /// No participant owns the device token.
    ParticipantNotFound,
}

/// Port for session rows and their participant sub-records.
///
/// Callers pass pre-validated drafts; adapters surface entity-level
/// validation failures as [`GroupSessionStoreError::Query`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupSessionStore: Send + Sync {
    /// Insert a freshly created session, failing when another live session
    /// already holds the code.
    async fn insert(&self, session: GroupSession) -> Result<(), GroupSessionStoreError>;

    /// Find a session that is open and unexpired at `now`.
    async fn find_live(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
    ) -> Result<Option<GroupSession>, GroupSessionStoreError>;

    /// Atomically admit a device: reconnect, or capacity-check and insert.
    async fn admit_participant(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        draft: ParticipantDraft,
    ) -> Result<AdmitParticipantOutcome, GroupSessionStoreError>;

    /// Atomically remove a non-host participant.
    async fn remove_guest(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        participant_id: ParticipantId,
    ) -> Result<RemoveGuestOutcome, GroupSessionStoreError>;

    /// Atomically replace one participant's cart.
    async fn replace_cart(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        device_id: &DeviceId,
        items: Vec<CartItem>,
    ) -> Result<ReplaceCartOutcome, GroupSessionStoreError>;

    /// Close a session regardless of expiry; returns whether a session
    /// transitioned to closed.
    async fn close(&self, code: &SessionCode) -> Result<bool, GroupSessionStoreError>;

    /// Close every open session past its expiry, returning the codes that
    /// transitioned.
    async fn close_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionCode>, GroupSessionStoreError>;
}
