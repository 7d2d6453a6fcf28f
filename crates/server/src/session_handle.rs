use crate::events::EventBuffer;
use crate::session::GameSession;
use crate::types::{EventCursor, ServerEvent};
use airlock_core::{GameError, Timestamp};
use airlock_types::SessionEvent;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A session together with its activity feed.
pub struct SessionEntry {
    pub session: GameSession,
    pub events: EventBuffer<SessionEvent>,
    /// Bumped by every update; orders copies handed to persistence.
    pub revision: u64,
}

impl SessionEntry {
    pub fn new(session: GameSession, event_buffer_capacity: usize) -> Self {
        Self {
            session,
            events: EventBuffer::new(event_buffer_capacity),
            revision: 0,
        }
    }

    fn record(&mut self, at: Timestamp, events: Vec<SessionEvent>) {
        for event in events {
            self.events.push(at, event);
        }
    }

    /// Advance time-derived state to `now` and feed whatever happened.
    fn sync(&mut self, now: Timestamp) {
        let mut events = Vec::new();
        self.session.sync(now, &mut events);
        self.record(now, events);
    }
}

/// Thread-safe handle to one session. Every operation on a session goes
/// through its lock, so operations on one session are serialized while
/// different sessions proceed independently.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionEntry>>,
}

impl SessionHandle {
    pub fn new(session: GameSession, event_buffer_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionEntry::new(
                session,
                event_buffer_capacity,
            ))),
        }
    }

    /// Run a mutation against the session, synced to `now` first.
    ///
    /// Events the mutation reports are recorded even if it then fails, since
    /// they describe transitions that already happened.
    pub async fn update<T, F>(&self, now: Timestamp, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut GameSession, &mut Vec<SessionEvent>) -> Result<T, GameError>,
    {
        let mut entry = self.inner.lock().await;
        entry.sync(now);
        let mut events = Vec::new();
        let result = f(&mut entry.session, &mut events);
        entry.record(now, events);
        entry.revision += 1;
        result
    }

    /// Read the session as of `now`.
    pub async fn read<T, F>(&self, now: Timestamp, f: F) -> T
    where
        F: FnOnce(&GameSession) -> T,
    {
        let mut entry = self.inner.lock().await;
        entry.sync(now);
        f(&entry.session)
    }

    /// Copy of the stored session, without syncing.
    pub async fn snapshot(&self) -> GameSession {
        self.inner.lock().await.session.clone()
    }

    /// Copy of the stored session with the revision it was taken at.
    pub async fn versioned(&self) -> (u64, GameSession) {
        let entry = self.inner.lock().await;
        (entry.revision, entry.session.clone())
    }

    pub async fn poll_events(
        &self,
        now: Timestamp,
        cursor: EventCursor,
    ) -> (Vec<ServerEvent<SessionEvent>>, EventCursor) {
        let mut entry = self.inner.lock().await;
        entry.sync(now);
        entry.events.get_from_cursor(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_combat::CombatConfig;
    use airlock_core::{Conflict, JoinCode, OwnerId, PlayerToken, SessionId};
    use airlock_puzzle::PuzzleContent;
    use airlock_types::SessionMode;

    fn handle() -> SessionHandle {
        let session = GameSession::new(
            SessionId::generate(),
            JoinCode::parse("HJK789").unwrap(),
            OwnerId::new("owner"),
            SessionMode::Puzzle,
            45,
            &CombatConfig::default(),
            Timestamp::from_millis(0),
        );
        SessionHandle::new(session, 16)
    }

    #[tokio::test]
    async fn updates_feed_the_event_buffer() {
        let handle = handle();
        let now = Timestamp::from_millis(10);
        let slot = handle
            .update(now, |session, events| {
                session.add_player(
                    PlayerToken::generate(),
                    "Ada",
                    &PuzzleContent::default(),
                    now,
                    events,
                )
            })
            .await
            .unwrap();
        assert_eq!(slot, 0);

        let (events, cursor) = handle.poll_events(now, EventCursor(0)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at, now);
        assert!(matches!(
            events[0].event,
            SessionEvent::PlayerJoined { slot: 0, .. }
        ));
        assert_eq!(cursor, EventCursor(1));
        assert_eq!(handle.versioned().await.0, 1);
    }

    #[tokio::test]
    async fn failed_updates_return_the_error() {
        let handle = handle();
        let err = handle
            .update(Timestamp::from_millis(0), |session, events| {
                session.end(events);
                session.set_overrides(Default::default())
            })
            .await
            .unwrap_err();
        assert_eq!(err, GameError::Conflict(Conflict::GameCompleted));

        let (events, _) = handle
            .poll_events(Timestamp::from_millis(0), EventCursor(0))
            .await;
        assert_eq!(events[0].event, SessionEvent::SessionEnded);
    }
}
