//! Per-connection stock feed handler.
//!
//! Keeps WebSocket framing and heartbeats at the edge while the feed
//! semantics live behind the injected subscription. The public contract
//! pings every 5s and considers a connection idle after 10s without client
//! traffic. Tests shorten these intervals to speed up feedback; adjust the
//! constants below if SLAs change so clients and intermediaries stay
//! aligned.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast::error::RecvError;
use tokio::time;
use tracing::warn;

use crate::domain::StockDelta;
use crate::domain::ports::StockSubscription;
use crate::inbound::ws::messages::StockFeedMessage;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_stock_session(
    subscription: StockSubscription,
    session: Session,
    stream: MessageStream,
) {
    StockFeedConnection::new(subscription).run(session, stream).await;
}

enum ConnectionEnd {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    /// The receiver fell behind and missed `skipped` deltas; the client
    /// must resubscribe for a fresh snapshot.
    Lagged(u64),
    FeedClosed,
    Serialization,
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

struct StockFeedConnection {
    subscription: StockSubscription,
}

impl StockFeedConnection {
    fn new(subscription: StockSubscription) -> Self {
        Self { subscription }
    }

    async fn run(mut self, mut session: Session, mut stream: MessageStream) {
        // The snapshot goes out first so the client has a baseline before
        // any delta arrives.
        let initial = StockFeedMessage::initial(&self.subscription.initial);
        if let Err(end) = Self::send_message(&mut session, &initial).await {
            self.finish(session, &end).await;
            return;
        }

        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    Self::handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    Self::handle_stream_message(&mut session, &mut last_heartbeat, message).await
                }
                delta = self.subscription.receiver.recv() => {
                    Self::handle_feed_event(&mut session, delta).await
                }
            };

            if let Err(end) = result {
                self.finish(session, &end).await;
                return;
            }
        }
    }

    async fn handle_heartbeat_tick(
        session: &mut Session,
        last_heartbeat: &Instant,
    ) -> Result<(), ConnectionEnd> {
        if Instant::now().duration_since(*last_heartbeat) > CLIENT_TIMEOUT {
            return Err(ConnectionEnd::HeartbeatTimeout);
        }

        session.ping(b"").await.map_err(ConnectionEnd::Network)
    }

    async fn handle_stream_message(
        session: &mut Session,
        last_heartbeat: &mut Instant,
        message: Option<Result<Message, ProtocolError>>,
    ) -> Result<(), ConnectionEnd> {
        let Some(message) = message else {
            return Err(ConnectionEnd::StreamClosed);
        };

        match message {
            Ok(Message::Ping(payload)) => {
                *last_heartbeat = Instant::now();
                session
                    .pong(&payload)
                    .await
                    .map_err(ConnectionEnd::Network)?;
                Ok(())
            }
            Ok(Message::Close(reason)) => Err(ConnectionEnd::ClientClosed(reason)),
            // The feed is server-to-client; any other inbound frame only
            // refreshes the idle timer.
            Ok(_) => {
                *last_heartbeat = Instant::now();
                Ok(())
            }
            Err(error) => Err(ConnectionEnd::Protocol(error)),
        }
    }

    async fn handle_feed_event(
        session: &mut Session,
        delta: Result<StockDelta, RecvError>,
    ) -> Result<(), ConnectionEnd> {
        match delta {
            Ok(delta) => Self::send_message(session, &StockFeedMessage::update(&delta)).await,
            Err(RecvError::Lagged(skipped)) => Err(ConnectionEnd::Lagged(skipped)),
            Err(RecvError::Closed) => Err(ConnectionEnd::FeedClosed),
        }
    }

    async fn send_message(
        session: &mut Session,
        message: &StockFeedMessage,
    ) -> Result<(), ConnectionEnd> {
        let body = serde_json::to_string(message).map_err(|error| {
            warn!(error = %error, "failed to serialize stock feed payload");
            ConnectionEnd::Serialization
        })?;
        session.text(body).await.map_err(ConnectionEnd::Network)
    }

    async fn finish(self, session: Session, end: &ConnectionEnd) {
        self.log_shutdown(end);
        if let CloseAction::Close(reason) = Self::close_action_for(end) {
            if let Err(error) = session.close(reason).await {
                warn!(error = %error, "failed to close stock feed connection");
            }
        }
    }

    fn log_shutdown(&self, end: &ConnectionEnd) {
        match end {
            ConnectionEnd::HeartbeatTimeout => {
                warn!("stock feed heartbeat timeout; closing connection");
            }
            ConnectionEnd::Protocol(error) => {
                warn!(error = %error, "stock feed protocol error");
            }
            ConnectionEnd::Lagged(skipped) => {
                warn!(skipped, "stock feed subscriber lagged; forcing resubscribe");
            }
            ConnectionEnd::Network(error) => {
                warn!(error = %error, "stock feed send failed; closing connection");
            }
            ConnectionEnd::ClientClosed(_)
            | ConnectionEnd::StreamClosed
            | ConnectionEnd::FeedClosed
            | ConnectionEnd::Serialization => {}
        }
    }

    fn close_action_for(end: &ConnectionEnd) -> CloseAction {
        match end {
            ConnectionEnd::HeartbeatTimeout => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Normal,
                description: Some("heartbeat timeout".to_owned()),
            })),
            ConnectionEnd::Protocol(_) => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Protocol,
                description: Some("protocol error".to_owned()),
            })),
            // The client cannot trust its view once deltas were dropped;
            // tell it to reconnect and start from a fresh snapshot.
            ConnectionEnd::Lagged(_) => CloseAction::Close(Some(CloseReason {
                code: CloseCode::Again,
                description: Some("feed lagged; resubscribe for a fresh snapshot".to_owned()),
            })),
            ConnectionEnd::FeedClosed | ConnectionEnd::Serialization => {
                CloseAction::Close(Some(CloseReason {
                    code: CloseCode::Away,
                    description: Some("feed shutting down".to_owned()),
                }))
            }
            ConnectionEnd::ClientClosed(reason) => CloseAction::Close(reason.clone()),
            ConnectionEnd::StreamClosed | ConnectionEnd::Network(_) => CloseAction::None,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
