use crate::errors::PersistError;
use crate::session::GameSession;
use serde::{Deserialize, Serialize};
use airlock_core::SessionId;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Layout version of the state file. Anything else is discarded on load.
pub const STATE_VERSION: u32 = 1;

/// The whole registry as written to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub sessions: Vec<GameSession>,
}

impl RegistryDocument {
    pub fn new(sessions: Vec<GameSession>) -> Self {
        Self {
            version: Some(STATE_VERSION),
            sessions,
        }
    }
}

pub async fn load_document(path: &Path) -> Result<Vec<GameSession>, PersistError> {
    let bytes = tokio::fs::read(path).await?;
    let document: RegistryDocument = serde_json::from_slice(&bytes)?;
    if document.version != Some(STATE_VERSION) {
        return Err(PersistError::Version(document.version));
    }
    Ok(document.sessions)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write to a sibling temp file, sync it and rename it over `path`, so
/// readers only ever see a complete document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let temp = temp_path(path);
    {
        let mut file = std::fs::File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&temp, path)?;
    Ok(())
}

type Pending = Option<(u64, Arc<Vec<u8>>)>;

/// Latest persisted copy of one session. `None` marks a deleted session, so a
/// stale copy staged after the delete cannot bring it back.
struct Staged {
    revision: u64,
    session: Option<GameSession>,
}

/// Per-session copies the next document is built from.
#[derive(Default)]
struct Ledger {
    generation: u64,
    sessions: HashMap<SessionId, Staged>,
}

impl Ledger {
    fn document(&self) -> RegistryDocument {
        let mut sessions: Vec<GameSession> = self
            .sessions
            .values()
            .filter_map(|staged| staged.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        RegistryDocument::new(sessions)
    }
}

/// Background writer for the registry.
///
/// Callers stage the session they changed, tagged with its revision. Only
/// newer revisions replace what is staged, and no session lock is needed to
/// build a document. The writer task only ever writes the newest pending
/// document; intermediate ones may be skipped.
pub struct Persister {
    ledger: Mutex<Ledger>,
    pending: watch::Sender<Pending>,
    written: watch::Receiver<u64>,
}

impl Persister {
    /// Start the writer. `loaded` is what is already on disk.
    pub fn spawn(path: PathBuf, loaded: Vec<GameSession>) -> Self {
        let (pending, mut rx) = watch::channel::<Pending>(None);
        let (written_tx, written) = watch::channel(0u64);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some((generation, bytes)) = rx.borrow_and_update().clone() else {
                    continue;
                };
                let target = path.clone();
                let result =
                    tokio::task::spawn_blocking(move || write_atomic(&target, &bytes)).await;
                match result {
                    Ok(Ok(())) => tracing::debug!(generation, "state written"),
                    Ok(Err(err)) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %err,
                            "failed to write state"
                        )
                    }
                    Err(err) => tracing::warn!(error = %err, "state writer panicked"),
                }
                written_tx.send_replace(generation);
            }
        });

        let sessions = loaded
            .into_iter()
            .map(|session| {
                let id = session.id.clone();
                let staged = Staged {
                    revision: 0,
                    session: Some(session),
                };
                (id, staged)
            })
            .collect();
        Self {
            ledger: Mutex::new(Ledger {
                generation: 0,
                sessions,
            }),
            pending,
            written,
        }
    }

    /// Record `session` as of `revision` and queue a new document.
    pub async fn stage(&self, revision: u64, session: GameSession) {
        let mut ledger = self.ledger.lock().await;
        if let Some(current) = ledger.sessions.get(&session.id) {
            if current.session.is_none() || current.revision >= revision {
                return;
            }
        }
        let id = session.id.clone();
        let staged = Staged {
            revision,
            session: Some(session),
        };
        ledger.sessions.insert(id, staged);
        self.publish(&mut ledger);
    }

    /// Drop a deleted session from every later document.
    pub async fn retire(&self, id: SessionId) {
        let mut ledger = self.ledger.lock().await;
        let staged = Staged {
            revision: u64::MAX,
            session: None,
        };
        ledger.sessions.insert(id, staged);
        self.publish(&mut ledger);
    }

    fn publish(&self, ledger: &mut Ledger) {
        match serde_json::to_vec(&ledger.document()) {
            Ok(bytes) => {
                ledger.generation += 1;
                self.pending
                    .send_replace(Some((ledger.generation, Arc::new(bytes))));
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize state"),
        }
    }

    /// Wait until everything published so far has been handled by the writer.
    pub async fn flush(&self) {
        let target = self.ledger.lock().await.generation;
        let mut written = self.written.clone();
        if written.wait_for(|done| *done >= target).await.is_err() {
            tracing::warn!("state writer stopped before flushing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_combat::CombatConfig;
    use airlock_core::{JoinCode, OwnerId, SessionId, Timestamp};
    use airlock_types::SessionMode;

    fn session() -> GameSession {
        GameSession::new(
            SessionId::generate(),
            JoinCode::parse("QRS456").unwrap(),
            OwnerId::new("owner"),
            SessionMode::Puzzle,
            45,
            &CombatConfig::default(),
            Timestamp::from_millis(42),
        )
    }

    #[tokio::test]
    async fn staged_sessions_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("airlock.json");
        let persister = Persister::spawn(path.clone(), Vec::new());

        persister.stage(1, session()).await;
        persister.flush().await;

        let sessions = load_document(&path).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].join_code.as_str(), "QRS456");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn stale_revisions_and_retired_sessions_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlock.json");
        let kept = session();
        let persister = Persister::spawn(path.clone(), vec![kept.clone()]);

        let mut newer = kept.clone();
        newer.deadline_minutes = 30;
        persister.stage(2, newer).await;
        persister.stage(1, kept.clone()).await;

        let mut gone = session();
        gone.id = SessionId("gone".to_string());
        persister.stage(1, gone.clone()).await;
        persister.retire(gone.id.clone()).await;
        persister.stage(5, gone).await;
        persister.flush().await;

        let sessions = load_document(&path).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, kept.id);
        assert_eq!(sessions[0].deadline_minutes, 30);
    }

    #[tokio::test]
    async fn wrong_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlock.json");
        std::fs::write(&path, r#"{"version":2,"sessions":[]}"#).unwrap();
        assert!(matches!(
            load_document(&path).await,
            Err(PersistError::Version(Some(2)))
        ));

        std::fs::write(&path, r#"{"sessions":[]}"#).unwrap();
        assert!(matches!(
            load_document(&path).await,
            Err(PersistError::Version(None))
        ));
    }

    #[tokio::test]
    async fn sparse_sessions_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlock.json");
        std::fs::write(
            &path,
            r#"{"version":1,"sessions":[{"id":"s-1","join_code":"ABCDEF","owner_id":"o"}]}"#,
        )
        .unwrap();

        let sessions = load_document(&path).await.unwrap();
        let s = &sessions[0];
        assert!(s.start_time.is_none());
        assert_eq!(s.status, airlock_types::SessionStatus::Waiting);
        assert_eq!(s.deadline_minutes, 45);
        assert!(s.players.is_empty());
        assert!(s.combat.is_none());
    }
}
