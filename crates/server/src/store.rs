use crate::errors::{GameError, PersistError};
use crate::observe::{player_snapshot, session_snapshot, session_summary, status_response};
use crate::persistence::{load_document, Persister};
use crate::session::GameSession;
use crate::session_handle::SessionHandle;
use crate::types::{EventCursor, PlayerPatch, StoreConfig};
use airlock_core::{Clock, JoinCode, OwnerId, PlayerSlot, PlayerToken, SessionId, Timestamp};
use airlock_puzzle::PuzzleOverrides;
use airlock_types::{
    AnswerResult, ClueResult, CombatAction, CombatAdminAction, CombatSyncResponse, EventsResult,
    FeedEvent, JoinResponse, PlayerSnapshot, SessionEvent, SessionMode, SessionSnapshot,
    SessionSummary, StageId, StatusResponse,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

/// The three indices. Kept consistent under the registry write lock.
#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, SessionHandle>,
    codes: HashMap<JoinCode, SessionId>,
    tokens: HashMap<PlayerToken, SessionId>,
}

impl Registry {
    fn insert(
        &mut self,
        session: GameSession,
        event_buffer_capacity: usize,
    ) -> Option<SessionHandle> {
        if self.sessions.contains_key(&session.id) || self.codes.contains_key(&session.join_code)
        {
            return None;
        }
        let id = session.id.clone();
        self.codes.insert(session.join_code.clone(), id.clone());
        for token in session.tokens() {
            self.tokens.insert(token.clone(), id.clone());
        }
        let handle = SessionHandle::new(session, event_buffer_capacity);
        self.sessions.insert(id, handle.clone());
        Some(handle)
    }

    /// Draw join codes until one is free.
    fn unique_code(&self) -> JoinCode {
        let mut rng = rand::thread_rng();
        loop {
            let code = JoinCode::random(&mut rng);
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }
}

/// Registry of every live session.
///
/// Lock order: registry before session. The registry lock is never taken
/// while a session lock is held.
pub struct SessionStore {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    registry: RwLock<Registry>,
    persister: OnceCell<Option<Persister>>,
}

impl SessionStore {
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            registry: RwLock::new(Registry::default()),
            persister: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Hydrate from disk exactly once, before the first operation.
    async fn ensure_loaded(&self) -> Option<&Persister> {
        self.persister
            .get_or_init(|| async {
                let Some(path) = self.config.state_path.clone() else {
                    return None;
                };
                let sessions = match load_document(&path).await {
                    Ok(sessions) => sessions,
                    Err(PersistError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                        tracing::info!(path = %path.display(), "no state file, starting empty");
                        Vec::new()
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %err,
                            "discarding unreadable state file"
                        );
                        Vec::new()
                    }
                };

                let mut registry = self.registry.write().await;
                let mut loaded = Vec::with_capacity(sessions.len());
                for session in sessions {
                    let id = session.id.clone();
                    let copy = session.clone();
                    if registry
                        .insert(session, self.config.event_buffer_capacity)
                        .is_some()
                    {
                        loaded.push(copy);
                    } else {
                        tracing::warn!(session = %id, "skipping duplicate session in state file");
                    }
                }
                tracing::info!(sessions = loaded.len(), "registry loaded");
                drop(registry);

                Some(Persister::spawn(path, loaded))
            })
            .await
            .as_ref()
    }

    /// Hand the changed session to the background writer. Only this
    /// session's lock is taken.
    async fn persist(&self, handle: &SessionHandle) {
        let Some(persister) = self.ensure_loaded().await else {
            return;
        };
        let (revision, session) = handle.versioned().await;
        persister.stage(revision, session).await;
    }

    /// Wait for pending writes. Only needed by tests and shutdown.
    pub async fn flush(&self) {
        if let Some(persister) = self.ensure_loaded().await {
            persister.flush().await;
        }
    }

    async fn handle_by_id(&self, id: &SessionId) -> Option<SessionHandle> {
        self.ensure_loaded().await;
        self.registry.read().await.sessions.get(id).cloned()
    }

    async fn handle_by_code(&self, code: &JoinCode) -> Option<SessionHandle> {
        self.ensure_loaded().await;
        let registry = self.registry.read().await;
        let id = registry.codes.get(code)?;
        registry.sessions.get(id).cloned()
    }

    async fn handle_by_token(&self, token: &PlayerToken) -> Option<SessionHandle> {
        self.ensure_loaded().await;
        let registry = self.registry.read().await;
        let id = registry.tokens.get(token)?;
        registry.sessions.get(id).cloned()
    }

    async fn player_handle(&self, token: &PlayerToken) -> Result<SessionHandle, GameError> {
        self.handle_by_token(token)
            .await
            .ok_or(GameError::NotFound("player"))
    }

    async fn admin_handle(&self, id: &SessionId) -> Result<SessionHandle, GameError> {
        self.handle_by_id(id)
            .await
            .ok_or(GameError::NotFound("session"))
    }

    pub async fn create_session(
        &self,
        owner: &OwnerId,
        mode: SessionMode,
    ) -> Result<SessionSnapshot, GameError> {
        if owner.0.trim().is_empty() {
            return Err(GameError::Validation("owner id is required".to_string()));
        }
        self.ensure_loaded().await;
        let now = self.now();

        let (session, handle) = {
            let mut registry = self.registry.write().await;
            let session = GameSession::new(
                SessionId::generate(),
                registry.unique_code(),
                owner.clone(),
                mode,
                self.config.default_deadline_minutes,
                &self.config.combat,
                now,
            );
            let snapshot = session_snapshot(&session, now);
            let handle = registry
                .insert(session, self.config.event_buffer_capacity)
                .ok_or_else(|| GameError::Persistence("duplicate session id".to_string()))?;
            (snapshot, handle)
        };
        tracing::info!(session = %session.id, join_code = %session.join_code, "session created");

        self.persist(&handle).await;
        Ok(session)
    }

    pub async fn session_by_id(&self, id: &SessionId) -> Option<SessionSnapshot> {
        let handle = self.handle_by_id(id).await?;
        let now = self.now();
        Some(handle.read(now, |s| session_snapshot(s, now)).await)
    }

    pub async fn session_by_code(&self, code: &JoinCode) -> Option<SessionSnapshot> {
        let handle = self.handle_by_code(code).await?;
        let now = self.now();
        Some(handle.read(now, |s| session_snapshot(s, now)).await)
    }

    pub async fn join_session(
        &self,
        code: &JoinCode,
        name: &str,
    ) -> Result<JoinResponse, GameError> {
        let handle = self
            .handle_by_code(code)
            .await
            .ok_or(GameError::NotFound("session"))?;
        let token = PlayerToken::generate();
        let now = self.now();

        let (session_id, slot) = handle
            .update(now, |session, events| {
                let slot =
                    session.add_player(token.clone(), name, &self.config.content, now, events)?;
                Ok((session.id.clone(), slot))
            })
            .await?;

        {
            let mut registry = self.registry.write().await;
            if registry.sessions.contains_key(&session_id) {
                registry.tokens.insert(token.clone(), session_id.clone());
            }
        }
        tracing::info!(session = %session_id, slot, "player joined");

        self.persist(&handle).await;
        Ok(JoinResponse {
            player_token: token.to_string(),
            session_id: session_id.to_string(),
            slot,
        })
    }

    pub async fn player_by_token(&self, token: &PlayerToken) -> Option<StatusResponse> {
        let handle = self.handle_by_token(token).await?;
        let now = self.now();
        handle
            .read(now, |session| {
                let index = session.player_index(token)?;
                Some(status_response(session, index, &self.config.scoring, now))
            })
            .await
    }


    pub async fn submit_answer(
        &self,
        token: &PlayerToken,
        stage: StageId,
        answer: &str,
    ) -> Result<AnswerResult, GameError> {
        let handle = self.player_handle(token).await?;
        let now = self.now();
        let result = handle
            .update(now, |session, events| {
                let index = session
                    .player_index(token)
                    .ok_or(GameError::NotFound("player"))?;
                session.submit_answer(index, stage, answer, &self.config.scoring, now, events)
            })
            .await?;
        tracing::debug!(
            stage = stage.name(),
            correct = result.correct,
            attempts = result.attempts_used,
            "answer submitted"
        );

        self.persist(&handle).await;
        Ok(result)
    }

    /// Apply a combat input (or just sync) and return the fresh state.
    pub async fn combat_action(
        &self,
        token: &PlayerToken,
        action: CombatAction,
    ) -> Result<CombatSyncResponse, GameError> {
        let handle = self.player_handle(token).await?;
        let now = self.now();
        let response = handle
            .update(now, |session, events| {
                let index = session
                    .player_index(token)
                    .ok_or(GameError::NotFound("player"))?;
                let shot = session.combat_action(index, action, now, events)?;
                Ok(CombatSyncResponse {
                    shot,
                    player: player_snapshot(session, index, &self.config.scoring, now),
                    session: session_snapshot(session, now),
                })
            })
            .await?;

        if action != CombatAction::None {
            self.persist(&handle).await;
        }
        Ok(response)
    }

    pub async fn submit_clue(
        &self,
        token: &PlayerToken,
        answer: &str,
    ) -> Result<ClueResult, GameError> {
        let handle = self.player_handle(token).await?;
        let now = self.now();
        let result = handle
            .update(now, |session, events| {
                session
                    .player_index(token)
                    .ok_or(GameError::NotFound("player"))?;
                session.submit_clue(answer, now, events)
            })
            .await?;
        tracing::debug!(correct = result.correct, solved = result.solved, "clue submitted");

        self.persist(&handle).await;
        Ok(result)
    }

    pub async fn poll_events(
        &self,
        token: &PlayerToken,
        cursor: u64,
    ) -> Result<EventsResult, GameError> {
        let handle = self.player_handle(token).await?;
        let (events, cursor) = handle.poll_events(self.now(), EventCursor(cursor)).await;
        Ok(EventsResult {
            events: events
                .into_iter()
                .map(|e| FeedEvent {
                    sequence: e.sequence,
                    at_ms: e.at.as_millis(),
                    event: e.event,
                })
                .collect(),
            cursor: cursor.0,
        })
    }

    /// Sessions owned by `owner`, newest first.
    pub async fn list_sessions(&self, owner: &OwnerId) -> Vec<SessionSummary> {
        self.ensure_loaded().await;
        let handles: Vec<SessionHandle> = {
            let registry = self.registry.read().await;
            registry.sessions.values().cloned().collect()
        };
        let now = self.now();

        let mut owned = Vec::new();
        for handle in handles {
            let entry = handle
                .read(now, |s| {
                    (&s.owner_id == owner).then(|| (s.created_at, session_summary(s)))
                })
                .await;
            owned.extend(entry);
        }
        owned.sort_by(|(a_at, a), (b_at, b)| b_at.cmp(a_at).then_with(|| a.id.cmp(&b.id)));
        owned.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Remove a session and every index entry pointing at it.
    ///
    /// Returns `Ok(false)` if there was nothing to delete.
    pub async fn delete_session(
        &self,
        id: &SessionId,
        owner: &OwnerId,
    ) -> Result<bool, GameError> {
        self.ensure_loaded().await;
        {
            let mut registry = self.registry.write().await;
            let Some(handle) = registry.sessions.get(id).cloned() else {
                return Ok(false);
            };
            let session = handle.snapshot().await;
            if &session.owner_id != owner {
                return Err(GameError::Unauthorized);
            }
            registry.codes.remove(&session.join_code);
            for token in session.tokens() {
                registry.tokens.remove(token);
            }
            registry.sessions.remove(id);
        }
        tracing::info!(session = %id, "session deleted");

        if let Some(persister) = self.ensure_loaded().await {
            persister.retire(id.clone()).await;
        }
        Ok(true)
    }

    /// Run an owner-gated mutation against a session.
    async fn administer<T, F>(
        &self,
        id: &SessionId,
        owner: &OwnerId,
        f: F,
    ) -> Result<T, GameError>
    where
        F: FnOnce(&mut GameSession, &mut Vec<SessionEvent>, Timestamp) -> Result<T, GameError>,
    {
        let handle = self.admin_handle(id).await?;
        let now = self.now();
        let result = handle
            .update(now, |session, events| {
                if &session.owner_id != owner {
                    return Err(GameError::Unauthorized);
                }
                f(session, events, now)
            })
            .await?;
        self.persist(&handle).await;
        Ok(result)
    }

    /// Administrative partial update of the player in `slot`.
    pub async fn mutate_player(
        &self,
        id: &SessionId,
        owner: &OwnerId,
        slot: PlayerSlot,
        patch: PlayerPatch,
    ) -> Result<PlayerSnapshot, GameError> {
        let snapshot = self
            .administer(id, owner, |session, events, now| {
                let index = session
                    .slot_index(slot)
                    .ok_or(GameError::NotFound("player"))?;
                session.apply_patch(index, patch, &self.config.scoring, events)?;
                Ok(player_snapshot(session, index, &self.config.scoring, now))
            })
            .await?;
        tracing::debug!(session = %id, slot, "player patched");
        Ok(snapshot)
    }

    pub async fn end_session(
        &self,
        id: &SessionId,
        owner: &OwnerId,
    ) -> Result<SessionSnapshot, GameError> {
        let snapshot = self
            .administer(id, owner, |session, events, now| {
                session.end(events);
                Ok(session_snapshot(session, now))
            })
            .await?;
        tracing::info!(session = %id, "session ended");
        Ok(snapshot)
    }

    /// Replace a session's puzzle overrides. Players already joined keep their
    /// assignments; new attempt caps apply immediately.
    pub async fn update_config(
        &self,
        id: &SessionId,
        owner: &OwnerId,
        overrides: PuzzleOverrides,
    ) -> Result<SessionSnapshot, GameError> {
        let snapshot = self
            .administer(id, owner, |session, _, now| {
                session.set_overrides(overrides)?;
                Ok(session_snapshot(session, now))
            })
            .await?;
        tracing::info!(session = %id, "session overrides updated");
        Ok(snapshot)
    }

    pub async fn combat_admin(
        &self,
        id: &SessionId,
        owner: &OwnerId,
        action: CombatAdminAction,
    ) -> Result<SessionSnapshot, GameError> {
        let snapshot = self
            .administer(id, owner, |session, events, now| {
                session.combat_admin(action, now, events)?;
                Ok(session_snapshot(session, now))
            })
            .await?;
        tracing::info!(session = %id, ?action, "combat admin action applied");
        Ok(snapshot)
    }
}
