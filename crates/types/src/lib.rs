//! Canonical serializable types for the Airlock session engine.
//!
//! Shared between `airlock_server` (which builds snapshots) and `airlock-web`
//! (which exposes them over HTTP). Status enums live here so the engine and
//! its clients agree on one spelling.

use serde::{Deserialize, Serialize};

/// Lifecycle of a session. Ordered: a session only ever moves forward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Active,
    Completed,
}

/// Progress of one player. Ordered: a player only ever moves forward.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Joined,
    Solving,
    Completed,
}

/// The sequential puzzle stages, in solving order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Decode,
    Translate,
    Challenge,
    Bonus,
}

impl StageId {
    pub const ALL: [StageId; 4] = [
        StageId::Decode,
        StageId::Translate,
        StageId::Challenge,
        StageId::Bonus,
    ];

    pub const fn index(self) -> usize {
        match self {
            StageId::Decode => 0,
            StageId::Translate => 1,
            StageId::Challenge => 2,
            StageId::Bonus => 3,
        }
    }

    /// The stage that must be completed before this one unlocks.
    pub const fn previous(self) -> Option<StageId> {
        match self {
            StageId::Decode => None,
            StageId::Translate => Some(StageId::Decode),
            StageId::Challenge => Some(StageId::Translate),
            StageId::Bonus => Some(StageId::Challenge),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StageId::Decode => "decode",
            StageId::Translate => "translate",
            StageId::Challenge => "challenge",
            StageId::Bonus => "bonus",
        }
    }
}

/// Combat difficulty preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Which game a session runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMode {
    /// Escape-room stages only.
    #[default]
    Puzzle,
    /// Escape-room stages plus the room-by-room combat run.
    Combat {
        #[serde(default)]
        difficulty: Difficulty,
    },
}

/// Phase of a combat run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    Waiting,
    RoomClearing,
    Victory,
    Defeat,
}

impl CombatPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, CombatPhase::Victory | CombatPhase::Defeat)
    }
}

/// Status effect carried by a monster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum StatusEffect {
    /// Deals more damage.
    Enraged,
    /// Moves faster.
    Hasted,
    /// Takes half damage.
    Shielded,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CreateSessionRequest {
    pub owner_id: String,
    #[serde(default)]
    pub mode: SessionMode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct JoinRequest {
    pub join_code: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SubmitAnswerRequest {
    pub stage: StageId,
    pub answer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ClueAnswerRequest {
    pub answer: String,
}

/// A player's combat input. `None` only syncs state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CombatAction {
    Move { x: f32, y: f32 },
    Shoot { x: f32, y: f32 },
    Reload,
    None,
}

/// Privileged combat override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CombatAdminAction {
    Pause,
    Resume,
    ForceVictory,
    ForceDefeat,
    /// Positive adds oxygen, negative removes it.
    AdjustOxygen { seconds: i64 },
    SkipRoom,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CreateSessionResponse {
    pub id: String,
    pub join_code: String,
    pub status: SessionStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct JoinResponse {
    pub player_token: String,
    pub session_id: String,
    pub slot: u8,
}

/// One stage as the owning player sees it. Answers are never included.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct StageView {
    pub stage: StageId,
    /// `text`, `multiple_choice` or `open_response`.
    pub kind: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub unlocked: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub completed: bool,
    pub score: u32,
}

/// A player's combat statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct FighterView {
    pub x: f32,
    pub y: f32,
    pub ammo: u32,
    pub reloading: bool,
    pub total_shots: u32,
    pub successful_shots: u32,
    pub accuracy: f32,
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub kills: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct PlayerSnapshot {
    pub name: String,
    pub slot: u8,
    pub status: PlayerStatus,
    pub total_score: u32,
    pub stages: Vec<StageView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<FighterView>,
}

/// Other players as seen by everyone in the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct PlayerSummary {
    pub name: String,
    pub slot: u8,
    pub status: PlayerStatus,
    pub total_score: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct MonsterView {
    pub id: String,
    pub tier: u8,
    pub health: u32,
    pub max_health: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub is_boss: bool,
    pub boss_phase: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<StatusEffect>,
}

/// The current room's cipher gate. The plaintext is never included.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ClueView {
    pub scheme: String,
    pub ciphertext: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub solved: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct RoomStatsView {
    pub room_index: usize,
    pub room_name: String,
    pub kills: u32,
    pub shots: u32,
    pub cleared: bool,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CombatView {
    pub phase: CombatPhase,
    pub paused: bool,
    pub difficulty: Difficulty,
    pub room_index: usize,
    pub room_name: String,
    pub rooms_total: usize,
    pub oxygen_remaining_ms: u64,
    pub room_elapsed_ms: u64,
    pub total_kills: u32,
    pub monsters: Vec<MonsterView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clue: Option<ClueView>,
    pub room_stats: Vec<RoomStatsView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SessionSnapshot {
    pub id: String,
    pub join_code: String,
    pub status: SessionStatus,
    pub mode: SessionMode,
    pub players: Vec<PlayerSummary>,
    pub deadline_minutes: u32,
    /// Milliseconds since the Unix epoch; absent until the first join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_ms: Option<u64>,
    pub remaining_ms: u64,
    /// True only when the timer has started and run out.
    pub expired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_unlock_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatView>,
    pub created_at_ms: u64,
}

/// Everything a polling client needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct StatusResponse {
    pub player: PlayerSnapshot,
    pub session: SessionSnapshot,
}

/// Entry in an administrator's session list.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct SessionSummary {
    pub id: String,
    pub join_code: String,
    pub status: SessionStatus,
    pub mode: SessionMode,
    pub player_count: u8,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_unlock_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ListSessionsResult {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AnswerResult {
    pub stage: StageId,
    pub correct: bool,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub score_delta: u32,
    /// No attempts remain and the stage was not completed.
    pub exhausted: bool,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ShotResult {
    pub hit: bool,
    pub damage: u32,
    pub killed: bool,
    pub ammo_left: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CombatSyncResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot: Option<ShotResult>,
    pub player: PlayerSnapshot,
    pub session: SessionSnapshot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ClueResult {
    pub correct: bool,
    pub attempts_used: u32,
    pub max_attempts: u32,
    pub exhausted: bool,
    pub solved: bool,
}

/// Something that happened in a session, for the polling activity feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PlayerJoined { slot: u8, name: String },
    StageCompleted { slot: u8, stage: StageId, score: u32 },
    PlayerCompleted { slot: u8, total_score: u32 },
    UnlockCodeAssigned { code: String },
    RoomEntered { room_index: usize, monsters: u32 },
    MonsterKilled { slot: u8, tier: u8, is_boss: bool },
    BossPhaseChanged { phase: u8 },
    ClueSolved { room_index: usize },
    RoomCleared { room_index: usize },
    Victory,
    Defeat,
    Paused,
    Resumed,
    OxygenAdjusted { delta_ms: i64 },
    RoomSkipped { room_index: usize },
    SessionEnded,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct FeedEvent {
    pub sequence: u64,
    pub at_ms: u64,
    pub event: SessionEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct EventsResult {
    pub events: Vec<FeedEvent>,
    pub cursor: u64,
}

/// Body of every non-2xx HTTP response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ErrorBody {
    pub kind: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_ordered_forward() {
        assert!(SessionStatus::Waiting < SessionStatus::Active);
        assert!(SessionStatus::Active < SessionStatus::Completed);
        assert!(PlayerStatus::Joined < PlayerStatus::Solving);
        assert!(PlayerStatus::Solving < PlayerStatus::Completed);
    }

    #[test]
    fn stage_order_matches_index() {
        for (i, stage) in StageId::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(StageId::Decode.previous(), None);
        assert_eq!(StageId::Bonus.previous(), Some(StageId::Challenge));
    }

    #[test]
    fn session_mode_defaults_difficulty() {
        let mode: SessionMode = serde_json::from_str(r#"{"type":"combat"}"#).unwrap();
        assert_eq!(
            mode,
            SessionMode::Combat {
                difficulty: Difficulty::Normal
            }
        );
    }

    #[test]
    fn combat_action_is_tagged() {
        let action: CombatAction =
            serde_json::from_str(r#"{"action":"shoot","x":10.0,"y":20.5}"#).unwrap();
        assert_eq!(action, CombatAction::Shoot { x: 10.0, y: 20.5 });

        let action: CombatAction = serde_json::from_str(r#"{"action":"reload"}"#).unwrap();
        assert_eq!(action, CombatAction::Reload);
    }

    #[test]
    fn admin_oxygen_adjustment_parses_negative_seconds() {
        let action: CombatAdminAction =
            serde_json::from_str(r#"{"action":"adjust_oxygen","seconds":-30}"#).unwrap();
        assert_eq!(action, CombatAdminAction::AdjustOxygen { seconds: -30 });
    }
}
