use airlock_combat::CombatConfig;
use airlock_core::Timestamp;
use airlock_puzzle::{PuzzleContent, ScoringConfig, StagePatch};
use airlock_types::{PlayerStatus, StageId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tracks position in an event stream for cursor-based retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EventCursor(pub u64);

/// An event with its sequence number for cursor tracking.
#[derive(Clone, Debug)]
pub struct ServerEvent<E> {
    pub sequence: u64,
    pub at: Timestamp,
    pub event: E,
}

/// Configuration for the session store.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Countdown for sessions without a deadline override.
    pub default_deadline_minutes: u32,
    /// Capacity of the activity feed per session.
    pub event_buffer_capacity: usize,
    /// Where the registry is persisted. `None` keeps everything in memory.
    pub state_path: Option<PathBuf>,
    pub scoring: ScoringConfig,
    pub content: PuzzleContent,
    pub combat: CombatConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_deadline_minutes: 45,
            event_buffer_capacity: 256,
            state_path: None,
            scoring: ScoringConfig::default(),
            content: PuzzleContent::default(),
            combat: CombatConfig::default(),
        }
    }
}

/// Administrative partial update of a player. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub status: Option<PlayerStatus>,
    pub stage: Option<StageUpdate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: StageId,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl StageUpdate {
    pub fn patch(self) -> StagePatch {
        StagePatch {
            attempts: self.attempts,
            completed: self.completed,
        }
    }
}
