//! Group-ordering domain service implementing the session driving ports.
//!
//! The service owns the session state machine: it validates input, applies
//! the rate-limit gate before any session lookup, and delegates membership
//! mutations to the store's atomic operations. Storage and transport stay
//! behind ports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::group_order::cart;
use crate::domain::ports::{
    AdmitParticipantOutcome, CreateSessionRequest, CreateSessionResponse, GetSessionRequest,
    GetSessionResponse, GroupOrderingCommand, GroupOrderingQuery, GroupSessionPayload,
    GroupSessionStore, GroupSessionStoreError, JoinAttemptLedger, JoinSessionRequest,
    JoinSessionResponse, KickParticipantRequest, KickParticipantResponse, LeaveSessionRequest,
    LeaveSessionResponse, RemoveGuestOutcome, ReplaceCartOutcome, SweepExpiredResponse,
    UpdateCartRequest, UpdateCartResponse,
};
use crate::domain::rate_limit::{JoinAttempt, JoinRateLimiter, RateLimitDecision};
use crate::domain::{
    CartItem, DeviceId, Error, GroupSession, GroupSessionDraft, ParticipantDraft, ParticipantId,
    SessionCode,
};

/// Environment variable overriding the session lifetime in minutes.
pub const SESSION_TTL_MINUTES_ENV: &str = "GROUP_SESSION_TTL_MINUTES";

/// Attempts at generating a collision-free join code before giving up.
const CODE_GENERATION_ATTEMPTS: u32 = 8;

/// Environment abstraction for session configuration lookups.
pub trait GroupOrderEnv {
    /// Fetch a string value by name.
    fn string(&self, name: &str) -> Option<String>;
}

/// Environment access backed by the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultGroupOrderEnv;

impl GroupOrderEnv for DefaultGroupOrderEnv {
    fn string(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Configuration for session lifecycle behaviour.
#[derive(Debug, Clone)]
pub struct GroupOrderConfig {
    session_ttl: Duration,
}

impl GroupOrderConfig {
    /// Default session lifetime in minutes.
    const DEFAULT_TTL_MINUTES: u64 = 120;

    /// Minimum allowed lifetime in minutes.
    const MIN_TTL_MINUTES: u64 = 5;

    /// Maximum allowed lifetime in minutes (one day).
    const MAX_TTL_MINUTES: u64 = 24 * 60;

    /// Load configuration from the real process environment.
    ///
    /// Reads `GROUP_SESSION_TTL_MINUTES` (default: 120), clamped to
    /// [5, 1440].
    pub fn from_env() -> Self {
        Self::from_env_with(&DefaultGroupOrderEnv)
    }

    /// Load configuration from a custom environment source.
    pub fn from_env_with(env: &impl GroupOrderEnv) -> Self {
        let minutes = env
            .string(SESSION_TTL_MINUTES_ENV)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TTL_MINUTES)
            .clamp(Self::MIN_TTL_MINUTES, Self::MAX_TTL_MINUTES);
        Self {
            session_ttl: Duration::from_secs(minutes.saturating_mul(60)),
        }
    }

    /// Create with an explicit lifetime (for testing).
    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self { session_ttl }
    }

    /// How long a session stays reachable after creation.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX))
    }
}

impl Default for GroupOrderConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(Self::DEFAULT_TTL_MINUTES * 60),
        }
    }
}

fn map_store_error(error: GroupSessionStoreError) -> Error {
    match error {
        GroupSessionStoreError::Connection { message } => {
            Error::service_unavailable(format!("group session store unavailable: {message}"))
        }
        GroupSessionStoreError::Query { message } => {
            Error::internal(format!("group session store error: {message}"))
        }
        GroupSessionStoreError::CodeTaken { code } => {
            Error::internal(format!("join code collision persisted for {code}"))
        }
    }
}

fn invalid_field(message: impl Into<String>, field: &'static str) -> Error {
    Error::invalid_request(message).with_details(json!({ "field": field }))
}

/// Session coordinator implementing the command and query driving ports.
#[derive(Clone)]
pub struct GroupOrderingService<S, L> {
    store: Arc<S>,
    limiter: JoinRateLimiter<L>,
    clock: Arc<dyn Clock>,
    config: GroupOrderConfig,
}

impl<S, L> GroupOrderingService<S, L> {
    /// Create a service over the session store and attempt ledger.
    pub fn new(
        store: Arc<S>,
        limiter: JoinRateLimiter<L>,
        clock: Arc<dyn Clock>,
        config: GroupOrderConfig,
    ) -> Self {
        Self {
            store,
            limiter,
            clock,
            config,
        }
    }
}

impl<S, L> GroupOrderingService<S, L>
where
    S: GroupSessionStore,
    L: JoinAttemptLedger,
{
    async fn insert_with_fresh_code(
        &self,
        request: &CreateSessionRequest,
        host_device_id: &DeviceId,
        now: DateTime<Utc>,
    ) -> Result<GroupSession, Error> {
        let expires_at = now + self.config.ttl_chrono();

        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let session = GroupSession::create(GroupSessionDraft {
                code: SessionCode::generate(),
                merchant_id: request.merchant_id,
                host_name: request.host_name.clone(),
                host_device_id: host_device_id.clone(),
                max_participants: request.max_participants,
                created_at: now,
                expires_at,
            })
            .map_err(|err| invalid_field(err.to_string(), "maxParticipants"))?;

            match self.store.insert(session.clone()).await {
                Ok(()) => return Ok(session),
                Err(GroupSessionStoreError::CodeTaken { code }) => {
                    warn!(code = %code, "join code collision; regenerating");
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }

        Err(Error::internal(
            "could not allocate a unique join code; retry the request",
        ))
    }

    /// Record the attempt outcome without failing the join on ledger
    /// trouble: the limiter is a throttle, not a gate on correct joins.
    async fn record_attempt(&self, attempt: JoinAttempt) {
        if let Err(error) = self.limiter.record(&attempt).await {
            warn!(error = %error, "failed to record join attempt");
        }
    }

    fn parse_device_id(raw: &str) -> Result<DeviceId, Error> {
        DeviceId::new(raw).map_err(|err| invalid_field(err.to_string(), "deviceId"))
    }

    fn parse_code(raw: &str) -> Result<SessionCode, Error> {
        SessionCode::parse(raw).map_err(|err| invalid_field(err.to_string(), "code"))
    }

    fn parse_cart_items(items: Vec<crate::domain::ports::CartItemPayload>) -> Result<Vec<CartItem>, Error> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                CartItem::try_from(item).map_err(|err| {
                    Error::invalid_request(err.to_string())
                        .with_details(json!({ "field": "items", "index": index }))
                })
            })
            .collect()
    }
}

#[async_trait]
impl<S, L> GroupOrderingCommand for GroupOrderingService<S, L>
where
    S: GroupSessionStore,
    L: JoinAttemptLedger,
{
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse, Error> {
        let now = self.clock.utc();
        let host_device_id = DeviceId::mint();
        let session = self
            .insert_with_fresh_code(&request, &host_device_id, now)
            .await?;

        let host_participant_id = session
            .host()
            .map(|host| *host.id().as_uuid())
            .ok_or_else(|| Error::internal("created session lost its host"))?;

        info!(
            code = session.code().as_str(),
            merchant_id = %session.merchant_id(),
            "group session opened"
        );

        Ok(CreateSessionResponse {
            session: GroupSessionPayload::from(&session),
            host_participant_id,
            device_id: host_device_id.as_str().to_owned(),
        })
    }

    async fn join_session(
        &self,
        request: JoinSessionRequest,
    ) -> Result<JoinSessionResponse, Error> {
        let code = Self::parse_code(&request.code)?;
        let device_id = match request.device_id.as_deref() {
            Some(raw) => Self::parse_device_id(raw)?,
            None => DeviceId::mint(),
        };
        let draft = ParticipantDraft {
            device_id: device_id.clone(),
            name: request.name,
        }
        .validated()
        .map_err(|err| invalid_field(err.to_string(), "name"))?;

        // Rate limiting runs before any session lookup so exhausted devices
        // learn nothing about which codes exist.
        let now = self.clock.utc();
        if let RateLimitDecision::Limited {
            retry_after_seconds,
        } = self.limiter.check(&device_id, now).await?
        {
            return Err(Error::rate_limited(
                "too many failed join attempts; wait before retrying",
                retry_after_seconds,
            ));
        }

        let outcome = self
            .store
            .admit_participant(&code, now, draft)
            .await
            .map_err(map_store_error)?;

        // Only a code that resolves to no live session counts as a failed
        // guess; a full session proves the code was right.
        let guessed_wrong = matches!(outcome, AdmitParticipantOutcome::SessionNotFound);
        let attempt = if guessed_wrong {
            JoinAttempt::failed(device_id.clone(), &code, now)
        } else {
            JoinAttempt::succeeded(device_id.clone(), &code, now)
        };
        self.record_attempt(attempt).await;

        match outcome {
            AdmitParticipantOutcome::SessionNotFound => Err(Error::session_not_found(format!(
                "no live session for code {code}"
            ))),
            AdmitParticipantOutcome::Full => Err(Error::session_full(format!(
                "session {code} is at its participant limit"
            ))),
            AdmitParticipantOutcome::Admitted {
                session,
                participant_id,
                reconnection,
            } => {
                info!(
                    code = code.as_str(),
                    participant_id = %participant_id,
                    reconnection,
                    "device joined group session"
                );
                Ok(JoinSessionResponse {
                    session: GroupSessionPayload::from(&session),
                    participant_id: *participant_id.as_uuid(),
                    device_id: device_id.as_str().to_owned(),
                    is_reconnection: reconnection,
                })
            }
        }
    }

    async fn kick_participant(
        &self,
        request: KickParticipantRequest,
    ) -> Result<KickParticipantResponse, Error> {
        let code = Self::parse_code(&request.code)?;
        let caller_device_id = Self::parse_device_id(&request.caller_device_id)?;
        let target_id = ParticipantId::from_uuid(request.target_participant_id);

        let now = self.clock.utc();
        let session = self
            .store
            .find_live(&code, now)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::session_not_found(format!("no live session for code {code}")))?;

        let caller_is_host = session
            .participant_by_device(&caller_device_id)
            .is_some_and(crate::domain::Participant::is_host);
        if !caller_is_host {
            return Err(Error::unauthorized("only the host may remove participants"));
        }

        let target = session
            .participant(target_id)
            .ok_or_else(|| Error::participant_not_found("participant is not in this session"))?;
        if target.is_host() {
            return Err(Error::invalid_operation(
                "the host cannot be kicked; close the session instead",
            ));
        }

        // Two-phase guard: surface the data loss and let the host confirm.
        // The confirmed call does not re-check emptiness, so a cart filled
        // between prompt and confirmation still gets removed.
        if !request.confirmed && !target.cart_items().is_empty() {
            let item_count =
                u32::try_from(cart::item_count(target.cart_items())).unwrap_or(u32::MAX);
            return Ok(KickParticipantResponse::ConfirmationRequired {
                participant_name: target.name().to_owned(),
                item_count,
            });
        }

        match self
            .store
            .remove_guest(&code, now, target_id)
            .await
            .map_err(map_store_error)?
        {
            RemoveGuestOutcome::Removed {
                session,
                participant,
            } => {
                info!(
                    code = code.as_str(),
                    participant_id = %participant.id(),
                    "participant kicked from group session"
                );
                Ok(KickParticipantResponse::Kicked {
                    session: GroupSessionPayload::from(&session),
                })
            }
            RemoveGuestOutcome::IsHost => Err(Error::invalid_operation(
                "the host cannot be kicked; close the session instead",
            )),
            RemoveGuestOutcome::ParticipantNotFound => Err(Error::participant_not_found(
                "participant left before the kick completed",
            )),
            RemoveGuestOutcome::SessionNotFound => Err(Error::session_not_found(format!(
                "no live session for code {code}"
            ))),
        }
    }

    async fn leave_session(
        &self,
        request: LeaveSessionRequest,
    ) -> Result<LeaveSessionResponse, Error> {
        let code = Self::parse_code(&request.code)?;
        let device_id = Self::parse_device_id(&request.device_id)?;

        let now = self.clock.utc();
        let session = self
            .store
            .find_live(&code, now)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::session_not_found(format!("no live session for code {code}")))?;

        let participant = session
            .participant_by_device(&device_id)
            .ok_or_else(|| Error::participant_not_found("device is not in this session"))?;

        if participant.is_host() {
            // The host leaving ends the session for everyone.
            self.store.close(&code).await.map_err(map_store_error)?;
            info!(code = code.as_str(), "host left; group session closed");
            return Ok(LeaveSessionResponse {
                session_closed: true,
            });
        }

        match self
            .store
            .remove_guest(&code, now, participant.id())
            .await
            .map_err(map_store_error)?
        {
            RemoveGuestOutcome::Removed { .. } => Ok(LeaveSessionResponse {
                session_closed: false,
            }),
            RemoveGuestOutcome::IsHost => Err(Error::invalid_operation(
                "the host leaves by closing the session",
            )),
            RemoveGuestOutcome::ParticipantNotFound => Err(Error::participant_not_found(
                "device already left this session",
            )),
            RemoveGuestOutcome::SessionNotFound => Err(Error::session_not_found(format!(
                "no live session for code {code}"
            ))),
        }
    }

    async fn update_cart(&self, request: UpdateCartRequest) -> Result<UpdateCartResponse, Error> {
        let code = Self::parse_code(&request.code)?;
        let device_id = Self::parse_device_id(&request.device_id)?;
        let items = Self::parse_cart_items(request.items)?;

        let now = self.clock.utc();
        match self
            .store
            .replace_cart(&code, now, &device_id, items)
            .await
            .map_err(map_store_error)?
        {
            ReplaceCartOutcome::Updated {
                session,
                participant_id,
            } => {
                let subtotal_cents = session
                    .participant(participant_id)
                    .map(|p| p.subtotal_cents())
                    .unwrap_or_default();
                Ok(UpdateCartResponse {
                    participant_id: *participant_id.as_uuid(),
                    subtotal_cents,
                    session_total_cents: cart::session_total_cents(session.participants()),
                })
            }
            ReplaceCartOutcome::ParticipantNotFound => Err(Error::participant_not_found(
                "device is not in this session",
            )),
            ReplaceCartOutcome::SessionNotFound => Err(Error::session_not_found(format!(
                "no live session for code {code}"
            ))),
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepExpiredResponse, Error> {
        let closed = self
            .store
            .close_expired(now)
            .await
            .map_err(map_store_error)?;
        if !closed.is_empty() {
            info!(count = closed.len(), "expiry sweep closed group sessions");
        }

        // Piggyback ledger maintenance on the sweep; rows outside every
        // window are dead weight.
        if let Err(error) = self.limiter.prune(now).await {
            warn!(error = %error, "join attempt pruning failed");
        }

        Ok(SweepExpiredResponse {
            closed: closed.into_iter().map(String::from).collect(),
        })
    }
}

#[async_trait]
impl<S, L> GroupOrderingQuery for GroupOrderingService<S, L>
where
    S: GroupSessionStore,
    L: JoinAttemptLedger,
{
    async fn get_session(&self, request: GetSessionRequest) -> Result<GetSessionResponse, Error> {
        let code = Self::parse_code(&request.code)?;
        let now = self.clock.utc();
        let session = self
            .store
            .find_live(&code, now)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::session_not_found(format!("no live session for code {code}")))?;

        Ok(GetSessionResponse {
            session: GroupSessionPayload::from(&session),
        })
    }
}

#[cfg(test)]
#[path = "group_ordering_service_tests.rs"]
mod tests;
