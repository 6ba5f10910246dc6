//! Driving ports for group-order session operations.
//!
//! Adapters depend on these traits rather than on the concrete service so
//! they stay testable with deterministic doubles. Every operation returns a
//! typed result: success payloads on `Ok`, one tagged failure on `Err`, and
//! the two-phase kick prompt as a dedicated response variant because it is
//! not an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::group_order::cart;
use crate::domain::{
    CartItem, CartValidationError, Error, GroupSession, Participant, SessionStatus,
};

/// Serializable cart line for driving ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub options: Vec<String>,
}

impl TryFrom<CartItemPayload> for CartItem {
    type Error = CartValidationError;

    fn try_from(value: CartItemPayload) -> Result<Self, Self::Error> {
        CartItem::new(
            value.menu_item_id,
            value.name,
            value.quantity,
            value.unit_price_cents,
            value.options,
        )
    }
}

impl From<&CartItem> for CartItemPayload {
    fn from(value: &CartItem) -> Self {
        Self {
            menu_item_id: value.menu_item_id(),
            name: value.name().to_owned(),
            quantity: value.quantity(),
            unit_price_cents: value.unit_price_cents(),
            options: value.options().to_vec(),
        }
    }
}

/// Serializable participant view for driving ports.
///
/// Device tokens are deliberately absent: they are correlation keys held by
/// their owning devices and never shown to other participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPayload {
    pub id: Uuid,
    pub name: String,
    pub is_host: bool,
    pub cart_items: Vec<CartItemPayload>,
    pub subtotal_cents: i64,
}

impl From<&Participant> for ParticipantPayload {
    fn from(value: &Participant) -> Self {
        Self {
            id: *value.id().as_uuid(),
            name: value.name().to_owned(),
            is_host: value.is_host(),
            cart_items: value.cart_items().iter().map(Into::into).collect(),
            subtotal_cents: value.subtotal_cents(),
        }
    }
}

/// Serializable session view for driving ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSessionPayload {
    pub code: String,
    pub merchant_id: Uuid,
    pub status: SessionStatus,
    pub expires_at: DateTime<Utc>,
    pub max_participants: u32,
    pub participants: Vec<ParticipantPayload>,
    /// Sum of every participant's subtotal, recomputed on read.
    pub session_total_cents: i64,
}

impl From<&GroupSession> for GroupSessionPayload {
    fn from(value: &GroupSession) -> Self {
        Self {
            code: value.code().as_str().to_owned(),
            merchant_id: value.merchant_id(),
            status: value.status(),
            expires_at: value.expires_at(),
            max_participants: value.max_participants(),
            participants: value.participants().iter().map(Into::into).collect(),
            session_total_cents: cart::session_total_cents(value.participants()),
        }
    }
}

/// Request to open a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub host_name: String,
    pub merchant_id: Uuid,
    pub max_participants: u32,
}

/// Response from opening a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session: GroupSessionPayload,
    pub host_participant_id: Uuid,
    /// Token minted for the host device; the client stores it locally and
    /// presents it on later calls.
    pub device_id: String,
}

/// Request to join or reconnect to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    pub code: String,
    pub name: String,
    /// Absent on a device's very first join; the service mints one.
    pub device_id: Option<String>,
}

/// Response from a successful join or reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionResponse {
    pub session: GroupSessionPayload,
    pub participant_id: Uuid,
    pub device_id: String,
    pub is_reconnection: bool,
}

/// Request to remove another participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickParticipantRequest {
    pub code: String,
    pub caller_device_id: String,
    pub target_participant_id: Uuid,
    /// Set on the second call of the two-phase flow.
    pub confirmed: bool,
}

/// Response from the kick operation.
///
/// `ConfirmationRequired` is a prompt, not an error: the server recomputed
/// the target's cart size and asks the host to confirm the data loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum KickParticipantResponse {
    /// The participant was removed. Terminal, no undo.
    #[serde(rename_all = "camelCase")]
    Kicked { session: GroupSessionPayload },
    /// The target's cart is non-empty and `confirmed` was not set.
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired {
        participant_name: String,
        item_count: u32,
    },
}

/// Request to leave a session voluntarily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSessionRequest {
    pub code: String,
    pub device_id: String,
}

/// Response from leaving a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSessionResponse {
    /// True when the host left and the whole session closed with them.
    pub session_closed: bool,
}

/// Request to replace the calling participant's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub code: String,
    pub device_id: String,
    pub items: Vec<CartItemPayload>,
}

/// Response from a cart replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartResponse {
    pub participant_id: Uuid,
    pub subtotal_cents: i64,
    pub session_total_cents: i64,
}

/// Request to read full session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionRequest {
    pub code: String,
}

/// Response carrying full session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionResponse {
    pub session: GroupSessionPayload,
}

/// Result of one expiry sweep pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepExpiredResponse {
    /// Codes of the sessions the pass closed.
    pub closed: Vec<String>,
}

/// Driving port for session mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupOrderingCommand: Send + Sync {
    /// Open a session and mint the host identity.
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, Error>;

    /// Join a session by code, reconnecting a returning device.
    async fn join_session(&self, request: JoinSessionRequest)
    -> Result<JoinSessionResponse, Error>;

    /// Remove another participant via the two-phase confirmation flow.
    async fn kick_participant(
        &self,
        request: KickParticipantRequest,
    ) -> Result<KickParticipantResponse, Error>;

    /// Leave voluntarily; a departing host closes the session.
    async fn leave_session(
        &self,
        request: LeaveSessionRequest,
    ) -> Result<LeaveSessionResponse, Error>;

    /// Replace the calling participant's cart wholesale.
    async fn update_cart(&self, request: UpdateCartRequest) -> Result<UpdateCartResponse, Error>;

    /// Close every session past its expiry as of `now`.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepExpiredResponse, Error>;
}

/// Driving port for session reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupOrderingQuery: Send + Sync {
    /// Read full session state for a live session.
    async fn get_session(&self, request: GetSessionRequest) -> Result<GetSessionResponse, Error>;
}
