//! Group-order session aggregate and its state machine.
//!
//! A session is the unit of mutual exclusion for membership changes: stores
//! mutate it only while holding its row lock, and the methods here keep the
//! membership invariants (single host, capacity bound, one participant per
//! device) local to the aggregate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CartItem;
use super::code::SessionCode;
use super::participant::{
    DeviceId, Participant, ParticipantDraft, ParticipantId, ParticipantValidationError,
};

/// Smallest accepted participant limit (the host plus one guest).
pub const MAX_PARTICIPANTS_MIN: u32 = 2;

/// Largest accepted participant limit.
pub const MAX_PARTICIPANTS_MAX: u32 = 20;

/// Validation errors for session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSessionValidationError {
    MaxParticipantsTooSmall { min: u32 },
    MaxParticipantsTooLarge { max: u32 },
    Participant(ParticipantValidationError),
}

impl fmt::Display for GroupSessionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxParticipantsTooSmall { min } => {
                write!(f, "max participants must be at least {min}")
            }
            Self::MaxParticipantsTooLarge { max } => {
                write!(f, "max participants must be at most {max}")
            }
            Self::Participant(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GroupSessionValidationError {}

/// Lifecycle state of a session. The transition is one-way: a closed
/// session never reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// Input payload for [`GroupSession::create`].
#[derive(Debug, Clone)]
pub struct GroupSessionDraft {
    pub code: SessionCode,
    pub merchant_id: Uuid,
    pub host_name: String,
    pub host_device_id: DeviceId,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of attempting to attach a device to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// A new participant record was created.
    Attached(ParticipantId),
    /// The device already participates; no record was created.
    Reconnected(ParticipantId),
    /// The participant limit is reached and the device is not a member.
    Full,
}

/// Result of removing a non-host participant.
#[derive(Debug, Clone, PartialEq)]
pub enum GuestRemoval {
    /// The participant was removed; the record is returned for logging.
    Removed(Participant),
    /// The target is the host, which only leaves by closing the session.
    IsHost,
    /// No participant with that id is attached.
    NotFound,
}

/// A shared, code-addressable group-ordering context for one merchant.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSession {
    code: SessionCode,
    merchant_id: Uuid,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    max_participants: u32,
    participants: Vec<Participant>,
}

impl GroupSession {
    /// Create a session with its single host participant.
    ///
    /// The host flag is set here and nowhere else, so the single-host
    /// invariant holds by construction.
    pub fn create(draft: GroupSessionDraft) -> Result<Self, GroupSessionValidationError> {
        if draft.max_participants < MAX_PARTICIPANTS_MIN {
            return Err(GroupSessionValidationError::MaxParticipantsTooSmall {
                min: MAX_PARTICIPANTS_MIN,
            });
        }
        if draft.max_participants > MAX_PARTICIPANTS_MAX {
            return Err(GroupSessionValidationError::MaxParticipantsTooLarge {
                max: MAX_PARTICIPANTS_MAX,
            });
        }

        let host = Participant::attach(draft.host_device_id, draft.host_name, true)
            .map_err(GroupSessionValidationError::Participant)?;

        Ok(Self {
            code: draft.code,
            merchant_id: draft.merchant_id,
            status: SessionStatus::Open,
            created_at: draft.created_at,
            expires_at: draft.expires_at,
            max_participants: draft.max_participants,
            participants: vec![host],
        })
    }

    /// The normalised join code.
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Merchant the order will be placed with.
    pub fn merchant_id(&self) -> Uuid {
        self.merchant_id
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Hard expiry; past this instant the session is treated as not found.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Participant limit enforced at admission time.
    pub fn max_participants(&self) -> u32 {
        self.max_participants
    }

    /// All attached participants, host first.
    pub fn participants(&self) -> &[Participant] {
        self.participants.as_slice()
    }

    /// Whether lookups should treat the session as reachable.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Open && self.expires_at > now
    }

    /// The host participant, if the session still holds one.
    ///
    /// Present for every open session; drained once the session closes.
    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host())
    }

    /// Find a participant by its device token.
    pub fn participant_by_device(&self, device_id: &DeviceId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.device_id() == device_id)
    }

    /// Find a participant by id.
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    /// Attach a device, reconnecting it when it already participates.
    ///
    /// The capacity check and the insert happen inside one call so the
    /// store's row lock makes them a single atomic step. Reconnection is
    /// checked first: a returning device is admitted even when the session
    /// is otherwise full.
    pub fn admit(
        &mut self,
        draft: ParticipantDraft,
    ) -> Result<Admission, ParticipantValidationError> {
        let draft = draft.validated()?;

        if let Some(existing) = self.participant_by_device(&draft.device_id) {
            return Ok(Admission::Reconnected(existing.id()));
        }
        if self.participants.len() >= self.max_participants as usize {
            return Ok(Admission::Full);
        }

        let participant = Participant::attach(draft.device_id, draft.name, false)?;
        let id = participant.id();
        self.participants.push(participant);
        Ok(Admission::Attached(id))
    }

    /// Remove a non-host participant. The host is refused: it only leaves
    /// by closing the session.
    pub fn remove_guest(&mut self, id: ParticipantId) -> GuestRemoval {
        let Some(index) = self.participants.iter().position(|p| p.id() == id) else {
            return GuestRemoval::NotFound;
        };
        if self.participants.get(index).is_some_and(Participant::is_host) {
            return GuestRemoval::IsHost;
        }
        GuestRemoval::Removed(self.participants.remove(index))
    }

    /// Replace the cart of the participant owning `device_id`.
    ///
    /// Returns the participant's id when found; touches no sibling record.
    pub fn replace_cart(
        &mut self,
        device_id: &DeviceId,
        items: Vec<CartItem>,
    ) -> Option<ParticipantId> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.device_id() == device_id)?;
        participant.replace_cart(items);
        Some(participant.id())
    }

    /// Close the session and cascade-delete its participants.
    pub fn close(&mut self) {
        self.status = SessionStatus::Closed;
        self.participants.clear();
    }
}
