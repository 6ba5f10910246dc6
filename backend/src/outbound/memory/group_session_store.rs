//! In-memory session store adapter.
//!
//! Holds session rows behind one async mutex, so every compound operation
//! is a single critical section: the capacity check and participant insert
//! cannot interleave with a racing join. A database adapter would scope the
//! same guarantees to a per-row transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::ports::{
    AdmitParticipantOutcome, GroupSessionStore, GroupSessionStoreError, RemoveGuestOutcome,
    ReplaceCartOutcome,
};
use crate::domain::{
    Admission, CartItem, DeviceId, GroupSession, GuestRemoval, ParticipantDraft, ParticipantId,
    SessionCode, SessionStatus,
};

/// Session store backed by process memory.
#[derive(Default)]
pub struct MemoryGroupSessionStore {
    sessions: Mutex<HashMap<SessionCode, GroupSession>>,
}

impl MemoryGroupSessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupSessionStore for MemoryGroupSessionStore {
    async fn insert(&self, session: GroupSession) -> Result<(), GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let code = session.code().clone();
        if let Some(existing) = sessions.get(&code) {
            // Codes are only unique among live sessions; a dead row with
            // the same code is replaced.
            if existing.is_live(session.created_at()) {
                return Err(GroupSessionStoreError::code_taken(code.as_str()));
            }
        }
        sessions.insert(code, session);
        Ok(())
    }

    async fn find_live(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
    ) -> Result<Option<GroupSession>, GroupSessionStoreError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(code)
            .filter(|session| session.is_live(now))
            .cloned())
    }

    async fn admit_participant(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        draft: ParticipantDraft,
    ) -> Result<AdmitParticipantOutcome, GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(code).filter(|s| s.is_live(now)) else {
            return Ok(AdmitParticipantOutcome::SessionNotFound);
        };

        match session
            .admit(draft)
            .map_err(|err| GroupSessionStoreError::query(err.to_string()))?
        {
            Admission::Attached(participant_id) => Ok(AdmitParticipantOutcome::Admitted {
                session: session.clone(),
                participant_id,
                reconnection: false,
            }),
            Admission::Reconnected(participant_id) => Ok(AdmitParticipantOutcome::Admitted {
                session: session.clone(),
                participant_id,
                reconnection: true,
            }),
            Admission::Full => Ok(AdmitParticipantOutcome::Full),
        }
    }

    async fn remove_guest(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        participant_id: ParticipantId,
    ) -> Result<RemoveGuestOutcome, GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(code).filter(|s| s.is_live(now)) else {
            return Ok(RemoveGuestOutcome::SessionNotFound);
        };

        match session.remove_guest(participant_id) {
            GuestRemoval::Removed(participant) => Ok(RemoveGuestOutcome::Removed {
                session: session.clone(),
                participant,
            }),
            GuestRemoval::IsHost => Ok(RemoveGuestOutcome::IsHost),
            GuestRemoval::NotFound => Ok(RemoveGuestOutcome::ParticipantNotFound),
        }
    }

    async fn replace_cart(
        &self,
        code: &SessionCode,
        now: DateTime<Utc>,
        device_id: &DeviceId,
        items: Vec<CartItem>,
    ) -> Result<ReplaceCartOutcome, GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(code).filter(|s| s.is_live(now)) else {
            return Ok(ReplaceCartOutcome::SessionNotFound);
        };

        match session.replace_cart(device_id, items) {
            Some(participant_id) => Ok(ReplaceCartOutcome::Updated {
                session: session.clone(),
                participant_id,
            }),
            None => Ok(ReplaceCartOutcome::ParticipantNotFound),
        }
    }

    async fn close(&self, code: &SessionCode) -> Result<bool, GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(code) else {
            return Ok(false);
        };
        let transitioned = session.status() == SessionStatus::Open;
        // Closed rows are dropped outright; participants cascade with them.
        sessions.remove(code);
        Ok(transitioned)
    }

    async fn close_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionCode>, GroupSessionStoreError> {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<SessionCode> = sessions
            .iter()
            .filter(|(_, session)| {
                session.status() == SessionStatus::Open && session.expires_at() <= now
            })
            .map(|(code, _)| code.clone())
            .collect();
        for code in &expired {
            sessions.remove(code);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn draft(code: &str, ttl_minutes: i64) -> crate::domain::GroupSessionDraft {
        let now = Utc::now();
        crate::domain::GroupSessionDraft {
            code: SessionCode::parse(code).expect("fixture code"),
            merchant_id: Uuid::new_v4(),
            host_name: "Priya".to_owned(),
            host_device_id: DeviceId::mint(),
            max_participants: 3,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    fn session(code: &str) -> GroupSession {
        GroupSession::create(draft(code, 60)).expect("valid session")
    }

    fn guest(name: &str) -> ParticipantDraft {
        ParticipantDraft {
            device_id: DeviceId::mint(),
            name: name.to_owned(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_live_code_collisions() {
        let store = MemoryGroupSessionStore::new();
        store.insert(session("VXK2PM")).await.expect("first insert");

        let error = store
            .insert(session("VXK2PM"))
            .await
            .expect_err("code collision");
        assert_eq!(
            error,
            GroupSessionStoreError::CodeTaken {
                code: "VXK2PM".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn insert_replaces_expired_rows_with_the_same_code() {
        let store = MemoryGroupSessionStore::new();
        let expired = GroupSession::create(draft("VXK2PM", -1)).expect("valid session");
        store.insert(expired).await.expect("insert expired row");

        store
            .insert(session("VXK2PM"))
            .await
            .expect("code is reusable once the old session is dead");
    }

    #[tokio::test]
    async fn find_live_hides_expired_sessions() {
        let store = MemoryGroupSessionStore::new();
        let code = SessionCode::parse("VXK2PM").expect("fixture code");
        let expired = GroupSession::create(draft("VXK2PM", -1)).expect("valid session");
        store.insert(expired).await.expect("insert");

        let found = store.find_live(&code, Utc::now()).await.expect("lookup");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn admit_is_atomic_under_concurrent_joins() {
        let store = std::sync::Arc::new(MemoryGroupSessionStore::new());
        let code = SessionCode::parse("VXK2PM").expect("fixture code");
        store.insert(session("VXK2PM")).await.expect("insert");

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = std::sync::Arc::clone(&store);
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                store
                    .admit_participant(&code, Utc::now(), guest(&format!("Guest {index}")))
                    .await
                    .expect("admit call succeeds")
            }));
        }

        let mut admitted = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.expect("task completes") {
                AdmitParticipantOutcome::Admitted { .. } => admitted += 1,
                AdmitParticipantOutcome::Full => full += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        // Limit is 3 with the host holding one slot.
        assert_eq!(admitted, 2);
        assert_eq!(full, 6);

        let final_state = store
            .find_live(&code, Utc::now())
            .await
            .expect("lookup")
            .expect("session live");
        assert_eq!(final_state.participants().len(), 3);
    }

    #[tokio::test]
    async fn close_drops_the_row() {
        let store = MemoryGroupSessionStore::new();
        let code = SessionCode::parse("VXK2PM").expect("fixture code");
        store.insert(session("VXK2PM")).await.expect("insert");

        assert!(store.close(&code).await.expect("close"));
        assert!(store
            .find_live(&code, Utc::now())
            .await
            .expect("lookup")
            .is_none());
        assert!(!store.close(&code).await.expect("second close is a no-op"));
    }

    #[tokio::test]
    async fn close_expired_sweeps_only_dead_sessions() {
        let store = MemoryGroupSessionStore::new();
        store
            .insert(GroupSession::create(draft("DEADAA", -1)).expect("valid session"))
            .await
            .expect("insert expired");
        store.insert(session("LIVEAA")).await.expect("insert live");

        let closed = store.close_expired(Utc::now()).await.expect("sweep");
        assert_eq!(closed.len(), 1);
        assert_eq!(
            closed.first().map(SessionCode::as_str),
            Some("DEADAA")
        );

        let live = SessionCode::parse("LIVEAA").expect("fixture code");
        assert!(store
            .find_live(&live, Utc::now())
            .await
            .expect("lookup")
            .is_some());
    }
}
