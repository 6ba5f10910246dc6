//! End-to-end group-ordering flows over the real in-memory stack.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::Mutex;
use uuid::Uuid;

use backend::domain::ports::{
    CreateSessionRequest, CreateSessionResponse, GroupOrderingCommand, GroupOrderingQuery,
    JoinSessionRequest, KickParticipantRequest, KickParticipantResponse, LeaveSessionRequest,
    UpdateCartRequest,
};
use backend::domain::{
    ErrorCode, GroupOrderConfig, GroupOrderingService, JoinRateLimiter, RateLimitConfig,
};
use backend::outbound::memory::{MemoryGroupSessionStore, MemoryJoinAttemptLedger};

/// Deterministic clock the tests can advance.
struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    fn starting_at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    fn at_epoch() -> Self {
        Self::starting_at(Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid epoch"))
    }

    fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

type Service = GroupOrderingService<MemoryGroupSessionStore, MemoryJoinAttemptLedger>;

fn build_service(clock: Arc<FixedClock>, rate_limit: RateLimitConfig) -> Service {
    GroupOrderingService::new(
        Arc::new(MemoryGroupSessionStore::new()),
        JoinRateLimiter::new(Arc::new(MemoryJoinAttemptLedger::new()), rate_limit),
        clock,
        GroupOrderConfig::with_session_ttl(Duration::from_secs(2 * 3600)),
    )
}

fn service_with_clock(clock: Arc<FixedClock>) -> Service {
    build_service(clock, RateLimitConfig::default())
}

async fn open_session(service: &Service, max_participants: u32) -> CreateSessionResponse {
    service
        .create_session(CreateSessionRequest {
            host_name: "Priya".to_owned(),
            merchant_id: Uuid::new_v4(),
            max_participants,
        })
        .await
        .expect("create succeeds")
}

fn join(code: &str, name: &str, device_id: Option<String>) -> JoinSessionRequest {
    JoinSessionRequest {
        code: code.to_owned(),
        name: name.to_owned(),
        device_id,
    }
}

#[tokio::test]
async fn host_guest_full_and_reconnect_scenario() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(clock);
    let created = open_session(&service, 2).await;
    let code = created.session.code;

    // Guest A takes the last slot.
    let joined_a = service
        .join_session(join(&code, "Ana", None))
        .await
        .expect("guest A joins");
    assert!(!joined_a.is_reconnection);
    assert_eq!(joined_a.session.participants.len(), 2);

    // Guest B bounces off the limit.
    let full = service
        .join_session(join(&code, "Ben", None))
        .await
        .expect_err("session full");
    assert_eq!(full.code(), ErrorCode::SessionFull);

    // Guest A reconnects with the same device token; count is unchanged.
    let reconnected = service
        .join_session(join(&code, "Ana", Some(joined_a.device_id.clone())))
        .await
        .expect("guest A reconnects");
    assert!(reconnected.is_reconnection);
    assert_eq!(reconnected.participant_id, joined_a.participant_id);
    assert_eq!(reconnected.session.participants.len(), 2);
}

#[tokio::test]
async fn codes_are_case_insensitive() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(clock);
    let created = open_session(&service, 4).await;

    let lowered = created.session.code.to_lowercase();
    let joined = service
        .join_session(join(&lowered, "Ana", None))
        .await
        .expect("join with lowercase code");
    assert_eq!(joined.session.code, created.session.code);
}

#[tokio::test]
async fn exactly_the_free_slots_win_under_concurrent_joins() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = Arc::new(service_with_clock(clock));
    let created = open_session(&service, 3).await;
    let code = created.session.code;

    let mut handles = Vec::new();
    for index in 0..10_u32 {
        let service = Arc::clone(&service);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            service
                .join_session(join(&code, &format!("Guest {index}"), None))
                .await
        }));
    }

    let mut joined = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => joined += 1,
            Err(error) => {
                assert_eq!(error.code(), ErrorCode::SessionFull);
                full += 1;
            }
        }
    }

    assert_eq!(joined, 2, "host holds one of three slots");
    assert_eq!(full, 8);

    let state = service
        .get_session(backend::domain::ports::GetSessionRequest { code })
        .await
        .expect("session readable");
    assert_eq!(state.session.participants.len(), 3);
    let hosts = state
        .session
        .participants
        .iter()
        .filter(|participant| participant.is_host)
        .count();
    assert_eq!(hosts, 1);
}

#[tokio::test]
async fn rate_limit_trips_after_three_failures_and_recovers() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = build_service(
        Arc::clone(&clock),
        RateLimitConfig::with_values(Duration::from_secs(60), 3),
    );
    let device = Uuid::new_v4().to_string();

    for _ in 0..3 {
        let error = service
            .join_session(join("WRONGG", "Ana", Some(device.clone())))
            .await
            .expect_err("unknown code");
        assert_eq!(error.code(), ErrorCode::SessionNotFound);
    }

    let limited = service
        .join_session(join("WRONGG", "Ana", Some(device.clone())))
        .await
        .expect_err("limited");
    assert_eq!(limited.code(), ErrorCode::RateLimited);
    let retry_after = limited.retry_after_seconds().expect("retry delay");
    assert!(retry_after > 0 && retry_after <= 60);

    // Even a correct code is refused while the window is exhausted.
    let created = open_session(&service, 4).await;
    let still_limited = service
        .join_session(join(&created.session.code, "Ana", Some(device.clone())))
        .await
        .expect_err("still limited");
    assert_eq!(still_limited.code(), ErrorCode::RateLimited);

    // Once the window has passed, the device is admitted again.
    clock.advance(chrono::Duration::seconds(61));
    service
        .join_session(join(&created.session.code, "Ana", Some(device)))
        .await
        .expect("admitted after the window");
}

#[tokio::test]
async fn two_phase_kick_discards_the_cart_only_when_confirmed() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(clock);
    let created = open_session(&service, 4).await;
    let code = created.session.code;

    let guest = service
        .join_session(join(&code, "Ana", None))
        .await
        .expect("guest joins");
    service
        .update_cart(UpdateCartRequest {
            code: code.clone(),
            device_id: guest.device_id.clone(),
            items: vec![backend::domain::ports::CartItemPayload {
                menu_item_id: Uuid::new_v4(),
                name: "Pad See Ew".to_owned(),
                quantity: 2,
                unit_price_cents: 1150,
                options: vec!["no egg".to_owned()],
            }],
        })
        .await
        .expect("cart update");

    let prompt = service
        .kick_participant(KickParticipantRequest {
            code: code.clone(),
            caller_device_id: created.device_id.clone(),
            target_participant_id: guest.participant_id,
            confirmed: false,
        })
        .await
        .expect("prompt, not error");
    assert_eq!(
        prompt,
        KickParticipantResponse::ConfirmationRequired {
            participant_name: "Ana".to_owned(),
            item_count: 1,
        }
    );

    // Nothing changed while the prompt was pending.
    let state = service
        .get_session(backend::domain::ports::GetSessionRequest { code: code.clone() })
        .await
        .expect("session readable");
    assert_eq!(state.session.participants.len(), 2);
    assert_eq!(state.session.session_total_cents, 2300);

    let kicked = service
        .kick_participant(KickParticipantRequest {
            code: code.clone(),
            caller_device_id: created.device_id,
            target_participant_id: guest.participant_id,
            confirmed: true,
        })
        .await
        .expect("kick succeeds");
    let KickParticipantResponse::Kicked { session } = kicked else {
        panic!("expected removal, got {kicked:?}");
    };
    assert_eq!(session.participants.len(), 1);
    assert_eq!(session.session_total_cents, 0);
}

#[tokio::test]
async fn guests_can_never_kick() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(clock);
    let created = open_session(&service, 4).await;
    let code = created.session.code;

    let ana = service
        .join_session(join(&code, "Ana", None))
        .await
        .expect("Ana joins");
    let ben = service
        .join_session(join(&code, "Ben", None))
        .await
        .expect("Ben joins");

    let error = service
        .kick_participant(KickParticipantRequest {
            code: code.clone(),
            caller_device_id: ana.device_id,
            target_participant_id: ben.participant_id,
            confirmed: true,
        })
        .await
        .expect_err("guests cannot kick");
    assert_eq!(error.code(), ErrorCode::Unauthorized);

    let state = service
        .get_session(backend::domain::ports::GetSessionRequest { code })
        .await
        .expect("session readable");
    assert_eq!(state.session.participants.len(), 3);
}

#[tokio::test]
async fn host_leave_closes_the_session_for_everyone() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(clock);
    let created = open_session(&service, 4).await;
    let code = created.session.code;

    service
        .join_session(join(&code, "Ana", None))
        .await
        .expect("guest joins");

    let left = service
        .leave_session(LeaveSessionRequest {
            code: code.clone(),
            device_id: created.device_id,
        })
        .await
        .expect("host leaves");
    assert!(left.session_closed);

    let error = service
        .join_session(join(&code, "Caro", None))
        .await
        .expect_err("closed sessions are unreachable");
    assert_eq!(error.code(), ErrorCode::SessionNotFound);
}

#[tokio::test]
async fn expired_sessions_vanish_and_sweep_reaps_them() {
    let clock = Arc::new(FixedClock::at_epoch());
    let service = service_with_clock(Arc::clone(&clock));
    let created = open_session(&service, 4).await;
    let code = created.session.code;

    clock.advance(chrono::Duration::hours(3));

    let error = service
        .join_session(join(&code, "Ana", None))
        .await
        .expect_err("expired sessions are not joinable");
    assert_eq!(error.code(), ErrorCode::SessionNotFound);

    let swept = service
        .sweep_expired(clock.utc())
        .await
        .expect("sweep succeeds");
    assert_eq!(swept.closed, vec![code]);

    let nothing_left = service
        .sweep_expired(clock.utc())
        .await
        .expect("sweep succeeds");
    assert!(nothing_left.closed.is_empty());
}
