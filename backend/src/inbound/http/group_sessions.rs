//! Group-order session HTTP handlers.
//!
//! ```text
//! POST /api/v1/group-sessions
//! POST /api/v1/group-sessions/{code}/join
//! GET  /api/v1/group-sessions/{code}
//! POST /api/v1/group-sessions/{code}/kick
//! POST /api/v1/group-sessions/{code}/leave
//! PUT  /api/v1/group-sessions/{code}/cart
//! ```

use actix_web::{get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CartItemPayload, CreateSessionRequest, CreateSessionResponse, GetSessionRequest,
    GroupSessionPayload, JoinSessionRequest, JoinSessionResponse, KickParticipantRequest,
    KickParticipantResponse, LeaveSessionRequest, ParticipantPayload, UpdateCartRequest,
    UpdateCartResponse,
};
use crate::domain::{Error, SessionStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid, require_positive};

/// Request payload for opening a session.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupSessionRequestBody {
    pub host_name: String,
    #[schema(format = "uuid")]
    pub merchant_id: String,
    pub max_participants: u32,
}

/// Request payload for joining a session.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupSessionRequestBody {
    pub name: String,
    /// Token from a previous visit; omitted on a device's first join.
    pub device_id: Option<String>,
}

/// Request payload for kicking a participant.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KickParticipantRequestBody {
    pub caller_device_id: String,
    #[schema(format = "uuid")]
    pub target_participant_id: String,
    /// Second phase of the confirmation flow; defaults to false.
    #[serde(default)]
    pub confirmed: bool,
}

/// Request payload for leaving a session.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGroupSessionRequestBody {
    pub device_id: String,
}

/// One cart line in a cart replacement request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemBody {
    #[schema(format = "uuid")]
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Request payload for replacing a cart wholesale.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequestBody {
    pub device_id: String,
    pub items: Vec<CartItemBody>,
}

/// Participant view returned to clients. Carries no device tokens.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub name: String,
    pub is_host: bool,
    pub cart_items: Vec<CartItemBody>,
    pub subtotal_cents: i64,
}

/// Session view returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupSessionBody {
    pub code: String,
    #[schema(format = "uuid")]
    pub merchant_id: String,
    pub status: String,
    #[schema(format = "date-time")]
    pub expires_at: String,
    pub max_participants: u32,
    pub participants: Vec<ParticipantBody>,
    pub session_total_cents: i64,
}

/// Response payload for session creation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupSessionResponseBody {
    pub session: GroupSessionBody,
    #[schema(format = "uuid")]
    pub host_participant_id: String,
    /// Token the host device stores locally and presents on later calls.
    pub device_id: String,
}

/// Response payload for a successful join or reconnect.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupSessionResponseBody {
    pub session: GroupSessionBody,
    #[schema(format = "uuid")]
    pub participant_id: String,
    pub device_id: String,
    pub is_reconnection: bool,
}

/// Response payload for the kick flow.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum KickParticipantResponseBody {
    /// The participant was removed.
    #[serde(rename_all = "camelCase")]
    Kicked { session: GroupSessionBody },
    /// The target's cart is non-empty; re-invoke with `confirmed: true`.
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired {
        participant_name: String,
        item_count: u32,
    },
}

/// Response payload for leaving a session.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGroupSessionResponseBody {
    pub session_closed: bool,
}

/// Response payload for a cart replacement.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartResponseBody {
    #[schema(format = "uuid")]
    pub participant_id: String,
    pub subtotal_cents: i64,
    pub session_total_cents: i64,
}

/// Response payload for reading session state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetGroupSessionResponseBody {
    pub session: GroupSessionBody,
}

impl From<&CartItemPayload> for CartItemBody {
    fn from(value: &CartItemPayload) -> Self {
        Self {
            menu_item_id: value.menu_item_id.to_string(),
            name: value.name.clone(),
            quantity: value.quantity,
            unit_price_cents: value.unit_price_cents,
            options: value.options.clone(),
        }
    }
}

impl From<&ParticipantPayload> for ParticipantBody {
    fn from(value: &ParticipantPayload) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name.clone(),
            is_host: value.is_host,
            cart_items: value.cart_items.iter().map(Into::into).collect(),
            subtotal_cents: value.subtotal_cents,
        }
    }
}

impl From<&GroupSessionPayload> for GroupSessionBody {
    fn from(value: &GroupSessionPayload) -> Self {
        let status = match value.status {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        };
        Self {
            code: value.code.clone(),
            merchant_id: value.merchant_id.to_string(),
            status: status.to_owned(),
            expires_at: value.expires_at.to_rfc3339(),
            max_participants: value.max_participants,
            participants: value.participants.iter().map(Into::into).collect(),
            session_total_cents: value.session_total_cents,
        }
    }
}

impl From<CreateSessionResponse> for CreateGroupSessionResponseBody {
    fn from(value: CreateSessionResponse) -> Self {
        Self {
            session: GroupSessionBody::from(&value.session),
            host_participant_id: value.host_participant_id.to_string(),
            device_id: value.device_id,
        }
    }
}

impl From<JoinSessionResponse> for JoinGroupSessionResponseBody {
    fn from(value: JoinSessionResponse) -> Self {
        Self {
            session: GroupSessionBody::from(&value.session),
            participant_id: value.participant_id.to_string(),
            device_id: value.device_id,
            is_reconnection: value.is_reconnection,
        }
    }
}

impl From<KickParticipantResponse> for KickParticipantResponseBody {
    fn from(value: KickParticipantResponse) -> Self {
        match value {
            KickParticipantResponse::Kicked { session } => Self::Kicked {
                session: GroupSessionBody::from(&session),
            },
            KickParticipantResponse::ConfirmationRequired {
                participant_name,
                item_count,
            } => Self::ConfirmationRequired {
                participant_name,
                item_count,
            },
        }
    }
}

impl From<UpdateCartResponse> for UpdateCartResponseBody {
    fn from(value: UpdateCartResponse) -> Self {
        Self {
            participant_id: value.participant_id.to_string(),
            subtotal_cents: value.subtotal_cents,
            session_total_cents: value.session_total_cents,
        }
    }
}

fn parse_cart_items(items: Vec<CartItemBody>) -> Result<Vec<CartItemPayload>, Error> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let menu_item_id =
                parse_uuid(&item.menu_item_id, FieldName::new("menuItemId")).map_err(|err| {
                    err.with_details(serde_json::json!({
                        "field": "items",
                        "index": index,
                        "code": "invalid_uuid",
                    }))
                })?;
            Ok(CartItemPayload {
                menu_item_id,
                name: item.name,
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                options: item.options,
            })
        })
        .collect()
}

/// Open a group-ordering session and mint the host identity.
#[utoipa::path(
    post,
    path = "/api/v1/group-sessions",
    request_body = CreateGroupSessionRequestBody,
    responses(
        (status = 200, description = "Session opened", body = CreateGroupSessionResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "createGroupSession"
)]
#[post("/group-sessions")]
pub async fn create_group_session(
    state: web::Data<HttpState>,
    payload: web::Json<CreateGroupSessionRequestBody>,
) -> ApiResult<web::Json<CreateGroupSessionResponseBody>> {
    let payload = payload.into_inner();
    let merchant_id = parse_uuid(&payload.merchant_id, FieldName::new("merchantId"))?;
    let max_participants =
        require_positive(payload.max_participants, FieldName::new("maxParticipants"))?;

    let response = state
        .group_ordering
        .create_session(CreateSessionRequest {
            host_name: payload.host_name,
            merchant_id,
            max_participants,
        })
        .await?;

    Ok(web::Json(CreateGroupSessionResponseBody::from(response)))
}

/// Join a session by code, reconnecting a returning device.
#[utoipa::path(
    post,
    path = "/api/v1/group-sessions/{code}/join",
    request_body = JoinGroupSessionRequestBody,
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Joined or reconnected", body = JoinGroupSessionResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "No live session for the code", body = Error),
        (status = 409, description = "Session full", body = Error),
        (status = 429, description = "Too many failed attempts", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "joinGroupSession"
)]
#[post("/group-sessions/{code}/join")]
pub async fn join_group_session(
    state: web::Data<HttpState>,
    code: web::Path<String>,
    payload: web::Json<JoinGroupSessionRequestBody>,
) -> ApiResult<web::Json<JoinGroupSessionResponseBody>> {
    let payload = payload.into_inner();
    let response = state
        .group_ordering
        .join_session(JoinSessionRequest {
            code: code.into_inner(),
            name: payload.name,
            device_id: payload.device_id,
        })
        .await?;

    Ok(web::Json(JoinGroupSessionResponseBody::from(response)))
}

/// Read full session state.
#[utoipa::path(
    get,
    path = "/api/v1/group-sessions/{code}",
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Session state", body = GetGroupSessionResponseBody),
        (status = 404, description = "No live session for the code", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "getGroupSession"
)]
#[get("/group-sessions/{code}")]
pub async fn get_group_session(
    state: web::Data<HttpState>,
    code: web::Path<String>,
) -> ApiResult<web::Json<GetGroupSessionResponseBody>> {
    let response = state
        .group_ordering_query
        .get_session(GetSessionRequest {
            code: code.into_inner(),
        })
        .await?;

    Ok(web::Json(GetGroupSessionResponseBody {
        session: GroupSessionBody::from(&response.session),
    }))
}

/// Remove a participant (host only, two-phase confirmation).
#[utoipa::path(
    post,
    path = "/api/v1/group-sessions/{code}/kick",
    request_body = KickParticipantRequestBody,
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Kicked, or confirmation required", body = KickParticipantResponseBody),
        (status = 401, description = "Caller is not the host", body = Error),
        (status = 404, description = "Session or participant not found", body = Error),
        (status = 409, description = "Target cannot be kicked", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "kickGroupSessionParticipant"
)]
#[post("/group-sessions/{code}/kick")]
pub async fn kick_group_session_participant(
    state: web::Data<HttpState>,
    code: web::Path<String>,
    payload: web::Json<KickParticipantRequestBody>,
) -> ApiResult<web::Json<KickParticipantResponseBody>> {
    let payload = payload.into_inner();
    let target_participant_id = parse_uuid(
        &payload.target_participant_id,
        FieldName::new("targetParticipantId"),
    )?;

    let response = state
        .group_ordering
        .kick_participant(KickParticipantRequest {
            code: code.into_inner(),
            caller_device_id: payload.caller_device_id,
            target_participant_id,
            confirmed: payload.confirmed,
        })
        .await?;

    Ok(web::Json(KickParticipantResponseBody::from(response)))
}

/// Leave a session; a departing host closes it.
#[utoipa::path(
    post,
    path = "/api/v1/group-sessions/{code}/leave",
    request_body = LeaveGroupSessionRequestBody,
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Left the session", body = LeaveGroupSessionResponseBody),
        (status = 404, description = "Session or participant not found", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "leaveGroupSession"
)]
#[post("/group-sessions/{code}/leave")]
pub async fn leave_group_session(
    state: web::Data<HttpState>,
    code: web::Path<String>,
    payload: web::Json<LeaveGroupSessionRequestBody>,
) -> ApiResult<web::Json<LeaveGroupSessionResponseBody>> {
    let response = state
        .group_ordering
        .leave_session(LeaveSessionRequest {
            code: code.into_inner(),
            device_id: payload.into_inner().device_id,
        })
        .await?;

    Ok(web::Json(LeaveGroupSessionResponseBody {
        session_closed: response.session_closed,
    }))
}

/// Replace the calling participant's cart wholesale.
#[utoipa::path(
    put,
    path = "/api/v1/group-sessions/{code}/cart",
    request_body = UpdateCartRequestBody,
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Cart replaced", body = UpdateCartResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Session or participant not found", body = Error)
    ),
    tags = ["group-sessions"],
    operation_id = "updateGroupSessionCart"
)]
#[put("/group-sessions/{code}/cart")]
pub async fn update_group_session_cart(
    state: web::Data<HttpState>,
    code: web::Path<String>,
    payload: web::Json<UpdateCartRequestBody>,
) -> ApiResult<web::Json<UpdateCartResponseBody>> {
    let payload = payload.into_inner();
    let items = parse_cart_items(payload.items)?;

    let response = state
        .group_ordering
        .update_cart(UpdateCartRequest {
            code: code.into_inner(),
            device_id: payload.device_id,
            items,
        })
        .await?;

    Ok(web::Json(UpdateCartResponseBody::from(response)))
}

#[cfg(test)]
#[path = "group_sessions_tests.rs"]
mod tests;
