//! Tests for group-order session HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::RETRY_AFTER;
use actix_web::{App, test as actix_test, web};
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    GetSessionResponse, LeaveSessionResponse, MockGroupOrderingCommand, MockGroupOrderingQuery,
    MockStockCommand,
};
use crate::domain::{DeviceId, GroupSession, GroupSessionDraft, SessionCode};

fn sample_session_payload() -> GroupSessionPayload {
    let now = Utc::now();
    let session = GroupSession::create(GroupSessionDraft {
        code: SessionCode::parse("VXK2PM").expect("fixture code"),
        merchant_id: Uuid::new_v4(),
        host_name: "Priya".to_owned(),
        host_device_id: DeviceId::mint(),
        max_participants: 4,
        created_at: now,
        expires_at: now + Duration::hours(2),
    })
    .expect("valid session");
    GroupSessionPayload::from(&session)
}

fn state_with(
    command: MockGroupOrderingCommand,
    query: MockGroupOrderingQuery,
) -> web::Data<HttpState> {
    web::Data::new(HttpState::new(
        Arc::new(command),
        Arc::new(query),
        Arc::new(MockStockCommand::new()),
    ))
}

macro_rules! test_app {
    ($state:expr) => {
        actix_test::init_service(
            App::new().app_data($state).service(
                web::scope("/api/v1")
                    .service(create_group_session)
                    .service(join_group_session)
                    .service(get_group_session)
                    .service(kick_group_session_participant)
                    .service(leave_group_session)
                    .service(update_group_session_cart),
            ),
        )
    };
}

#[actix_web::test]
async fn create_returns_session_and_host_identity() {
    let payload = sample_session_payload();
    let host_id = payload.participants.first().expect("host present").id;
    let mut command = MockGroupOrderingCommand::new();
    command.expect_create_session().return_once(move |request| {
        assert_eq!(request.host_name, "Priya");
        assert_eq!(request.max_participants, 4);
        Ok(CreateSessionResponse {
            session: payload,
            host_participant_id: host_id,
            device_id: "host-token".to_owned(),
        })
    });

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions")
        .set_json(serde_json::json!({
            "hostName": "Priya",
            "merchantId": Uuid::new_v4().to_string(),
            "maxParticipants": 4
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.get("deviceId").and_then(Value::as_str),
        Some("host-token")
    );
    assert_eq!(
        body.pointer("/session/code").and_then(Value::as_str),
        Some("VXK2PM")
    );
}

#[actix_web::test]
async fn create_rejects_malformed_merchant_ids() {
    let mut command = MockGroupOrderingCommand::new();
    command.expect_create_session().times(0);

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions")
        .set_json(serde_json::json!({
            "hostName": "Priya",
            "merchantId": "not-a-uuid",
            "maxParticipants": 4
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.get("code").and_then(Value::as_str),
        Some("invalid_request")
    );
}

#[actix_web::test]
async fn join_passes_device_token_through() {
    let payload = sample_session_payload();
    let mut command = MockGroupOrderingCommand::new();
    command.expect_join_session().return_once(move |request| {
        assert_eq!(request.code, "vxk2pm");
        assert_eq!(request.device_id.as_deref(), Some("guest-token"));
        Ok(JoinSessionResponse {
            session: payload,
            participant_id: Uuid::new_v4(),
            device_id: "guest-token".to_owned(),
            is_reconnection: true,
        })
    });

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions/vxk2pm/join")
        .set_json(serde_json::json!({
            "name": "Ana",
            "deviceId": "guest-token"
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("isReconnection").and_then(Value::as_bool), Some(true));
}

#[actix_web::test]
async fn join_surfaces_rate_limits_with_retry_after() {
    let mut command = MockGroupOrderingCommand::new();
    command
        .expect_join_session()
        .return_once(|_| Err(Error::rate_limited("too many attempts", 42)));

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions/vxk2pm/join")
        .set_json(serde_json::json!({ "name": "Ana" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("42")
    );
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.get("retryAfterSeconds").and_then(Value::as_u64),
        Some(42)
    );
}

#[actix_web::test]
async fn join_distinguishes_unknown_codes_from_full_sessions() {
    let mut command = MockGroupOrderingCommand::new();
    let mut calls = 0_u32;
    command.expect_join_session().times(2).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Err(Error::session_not_found("no live session"))
        } else {
            Err(Error::session_full("at limit"))
        }
    });

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;

    let first = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/group-sessions/vxk2pm/join")
            .set_json(serde_json::json!({ "name": "Ana" }))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::NOT_FOUND);
    let body: Value = actix_test::read_body_json(first).await;
    assert_eq!(
        body.get("code").and_then(Value::as_str),
        Some("session_not_found")
    );

    let second = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/group-sessions/vxk2pm/join")
            .set_json(serde_json::json!({ "name": "Ana" }))
            .to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(second).await;
    assert_eq!(
        body.get("code").and_then(Value::as_str),
        Some("session_full")
    );
}

#[actix_web::test]
async fn kick_renders_the_confirmation_prompt() {
    let mut command = MockGroupOrderingCommand::new();
    command.expect_kick_participant().return_once(|request| {
        assert!(!request.confirmed);
        Ok(KickParticipantResponse::ConfirmationRequired {
            participant_name: "Ana".to_owned(),
            item_count: 3,
        })
    });

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions/vxk2pm/kick")
        .set_json(serde_json::json!({
            "callerDeviceId": "host-token",
            "targetParticipantId": Uuid::new_v4().to_string()
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body.get("outcome").and_then(Value::as_str),
        Some("confirmationRequired")
    );
    assert_eq!(body.get("participantName").and_then(Value::as_str), Some("Ana"));
    assert_eq!(body.get("itemCount").and_then(Value::as_u64), Some(3));
}

#[actix_web::test]
async fn kick_maps_unauthorized_callers() {
    let mut command = MockGroupOrderingCommand::new();
    command
        .expect_kick_participant()
        .return_once(|_| Err(Error::unauthorized("only the host may remove participants")));

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions/vxk2pm/kick")
        .set_json(serde_json::json!({
            "callerDeviceId": "guest-token",
            "targetParticipantId": Uuid::new_v4().to_string(),
            "confirmed": true
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn leave_reports_session_closure() {
    let mut command = MockGroupOrderingCommand::new();
    command
        .expect_leave_session()
        .return_once(|_| Ok(LeaveSessionResponse { session_closed: true }));

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::post()
        .uri("/api/v1/group-sessions/vxk2pm/leave")
        .set_json(serde_json::json!({ "deviceId": "host-token" }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("sessionClosed").and_then(Value::as_bool), Some(true));
}

#[actix_web::test]
async fn cart_update_rejects_malformed_menu_ids() {
    let mut command = MockGroupOrderingCommand::new();
    command.expect_update_cart().times(0);

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::put()
        .uri("/api/v1/group-sessions/vxk2pm/cart")
        .set_json(serde_json::json!({
            "deviceId": "guest-token",
            "items": [{
                "menuItemId": "nope",
                "name": "Pad Thai",
                "quantity": 1,
                "unitPriceCents": 1250
            }]
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cart_update_returns_new_totals() {
    let mut command = MockGroupOrderingCommand::new();
    command.expect_update_cart().return_once(|request| {
        assert_eq!(request.items.len(), 1);
        Ok(UpdateCartResponse {
            participant_id: Uuid::new_v4(),
            subtotal_cents: 1250,
            session_total_cents: 2650,
        })
    });

    let app = test_app!(state_with(command, MockGroupOrderingQuery::new())).await;
    let request = actix_test::TestRequest::put()
        .uri("/api/v1/group-sessions/vxk2pm/cart")
        .set_json(serde_json::json!({
            "deviceId": "guest-token",
            "items": [{
                "menuItemId": Uuid::new_v4().to_string(),
                "name": "Pad Thai",
                "quantity": 1,
                "unitPriceCents": 1250
            }]
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("subtotalCents").and_then(Value::as_i64), Some(1250));
    assert_eq!(
        body.get("sessionTotalCents").and_then(Value::as_i64),
        Some(2650)
    );
}

#[actix_web::test]
async fn get_session_renders_participants_without_device_tokens() {
    let payload = sample_session_payload();
    let mut query = MockGroupOrderingQuery::new();
    query.expect_get_session().return_once(move |request| {
        assert_eq!(request.code, "vxk2pm");
        Ok(GetSessionResponse { session: payload })
    });

    let app = test_app!(state_with(MockGroupOrderingCommand::new(), query)).await;
    let request = actix_test::TestRequest::get()
        .uri("/api/v1/group-sessions/vxk2pm")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert!(response.status().is_success());
    let body: Value = actix_test::read_body_json(response).await;
    let participants = body
        .pointer("/session/participants")
        .and_then(Value::as_array)
        .expect("participants array");
    assert_eq!(participants.len(), 1);
    assert!(participants
        .iter()
        .all(|participant| participant.get("deviceId").is_none()));
}
