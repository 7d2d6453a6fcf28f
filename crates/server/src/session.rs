use crate::types::PlayerPatch;
use airlock_combat::{CombatConfig, CombatState};
use airlock_core::{
    Conflict, GameError, JoinCode, Millis, OwnerId, PlayerSlot, PlayerToken, SessionId,
    Timestamp, MAX_PLAYERS,
};
use airlock_puzzle::{
    derive_unlock_code, PlayerProgress, PuzzleAssignment, PuzzleContent, PuzzleOverrides,
    ScoringConfig,
};
use airlock_types::{
    AnswerResult, ClueResult, CombatAction, CombatAdminAction, CombatPhase, PlayerStatus,
    SessionEvent, SessionMode, SessionStatus, ShotResult, StageId,
};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 32;

fn default_deadline_minutes() -> u32 {
    45
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub token: PlayerToken,
    pub name: String,
    pub slot: PlayerSlot,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub progress: PlayerProgress,
    pub assignment: PuzzleAssignment,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub joined_at: Timestamp,
}

impl Player {
    /// Recompute derived fields after a progress change. Status only moves forward.
    fn refresh(&mut self) {
        self.total_score = self.progress.total_score();
        let derived = if self.progress.all_completed() {
            PlayerStatus::Completed
        } else if self.progress.any_attempted() {
            PlayerStatus::Solving
        } else {
            PlayerStatus::Joined
        };
        self.status = self.status.max(derived);
    }
}

/// A live game instance. Persisted as-is; every field added later must
/// default so older state files keep loading.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameSession {
    pub id: SessionId,
    pub join_code: JoinCode,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub mode: SessionMode,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    /// Deployment default captured at creation; overrides take precedence.
    #[serde(default = "default_deadline_minutes")]
    pub deadline_minutes: u32,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub final_unlock_code: Option<String>,
    #[serde(default)]
    pub overrides: PuzzleOverrides,
    #[serde(default)]
    pub combat: Option<CombatState>,
    #[serde(default)]
    pub created_at: Timestamp,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        join_code: JoinCode,
        owner_id: OwnerId,
        mode: SessionMode,
        deadline_minutes: u32,
        combat_config: &CombatConfig,
        now: Timestamp,
    ) -> Self {
        let combat = match mode {
            SessionMode::Puzzle => None,
            SessionMode::Combat { difficulty } => Some(CombatState::new(
                difficulty,
                rand::random(),
                Millis::from_mins(deadline_minutes),
                combat_config.clone(),
            )),
        };
        Self {
            id,
            join_code,
            owner_id,
            mode,
            players: Vec::new(),
            start_time: None,
            deadline_minutes,
            status: SessionStatus::Waiting,
            final_unlock_code: None,
            overrides: PuzzleOverrides::default(),
            combat,
            created_at: now,
        }
    }

    pub fn effective_deadline_minutes(&self) -> u32 {
        self.overrides
            .deadline_minutes
            .unwrap_or(self.deadline_minutes)
    }

    pub fn deadline(&self) -> Millis {
        Millis::from_mins(self.effective_deadline_minutes())
    }

    /// Time left on the countdown. Zero until the first player joins.
    pub fn remaining_time(&self, now: Timestamp) -> Millis {
        match self.start_time {
            None => Millis::ZERO,
            Some(start) => self.deadline().saturating_sub(now.saturating_since(start)),
        }
    }

    /// Only a started timer can expire.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.start_time.is_some() && self.remaining_time(now).is_zero()
    }

    pub fn player_index(&self, token: &PlayerToken) -> Option<usize> {
        self.players.iter().position(|p| &p.token == token)
    }

    pub fn slot_index(&self, slot: PlayerSlot) -> Option<usize> {
        self.players.iter().position(|p| p.slot == slot)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &PlayerToken> {
        self.players.iter().map(|p| &p.token)
    }

    fn ensure_open(&self) -> Result<(), Conflict> {
        if self.status == SessionStatus::Completed {
            Err(Conflict::GameCompleted)
        } else {
            Ok(())
        }
    }

    /// Bring time-derived state up to `now`. A completed session is frozen.
    pub fn sync(&mut self, now: Timestamp, events: &mut Vec<SessionEvent>) {
        if self.status == SessionStatus::Completed {
            return;
        }
        if let Some(combat) = self.combat.as_mut() {
            combat.advance(now, events);
        }
        self.settle_combat();
    }

    /// A finished combat run completes the session.
    fn settle_combat(&mut self) {
        let finished = self
            .combat
            .as_ref()
            .is_some_and(|combat| combat.phase.is_terminal());
        if finished && self.status != SessionStatus::Completed {
            tracing::info!(session = %self.id, "combat finished, session completed");
            self.status = SessionStatus::Completed;
        }
    }

    pub fn add_player(
        &mut self,
        token: PlayerToken,
        name: &str,
        content: &PuzzleContent,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<PlayerSlot, GameError> {
        self.ensure_open()?;
        if self.players.len() >= MAX_PLAYERS {
            return Err(Conflict::GameFull.into());
        }
        let name = validate_name(name)?;

        let slot = self.players.len() as PlayerSlot;
        let assignment = content.with_overrides(&self.overrides).assign(slot);
        self.players.push(Player {
            token,
            name: name.clone(),
            slot,
            status: PlayerStatus::Joined,
            progress: PlayerProgress::default(),
            assignment,
            total_score: 0,
            joined_at: now,
        });
        events.push(SessionEvent::PlayerJoined { slot, name });

        if self.start_time.is_none() {
            self.start_time = Some(now);
            self.status = SessionStatus::Active;
        }
        let deadline = self.deadline();
        if let Some(combat) = self.combat.as_mut() {
            combat.fighter_mut(slot);
            if combat.phase == CombatPhase::Waiting {
                combat.oxygen_remaining = deadline;
                combat.start(now, events);
            }
        }
        Ok(slot)
    }

    pub fn submit_answer(
        &mut self,
        index: usize,
        stage: StageId,
        answer: &str,
        scoring: &ScoringConfig,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<AnswerResult, GameError> {
        self.ensure_open()?;
        if self.is_expired(now) {
            return Err(Conflict::DeadlineExpired.into());
        }
        let rules = scoring.effective(stage, &self.overrides);
        let player = &mut self.players[index];

        let outcome = player.progress.submit(
            stage,
            player.assignment.get(stage),
            answer,
            rules,
            scoring.attempt_penalty,
        )?;
        let was_completed = player.status == PlayerStatus::Completed;
        player.refresh();

        if outcome.correct {
            events.push(SessionEvent::StageCompleted {
                slot: player.slot,
                stage,
                score: outcome.score_delta,
            });
        }
        if !was_completed && player.status == PlayerStatus::Completed {
            events.push(SessionEvent::PlayerCompleted {
                slot: player.slot,
                total_score: player.total_score,
            });
        }
        let completed = player.progress.stage(stage).completed;
        self.check_unlock(events);

        Ok(AnswerResult {
            stage,
            correct: outcome.correct,
            attempts_used: outcome.attempts_used,
            max_attempts: outcome.max_attempts,
            score_delta: outcome.score_delta,
            exhausted: outcome.exhausted,
            completed,
        })
    }

    /// Apply an administrative patch. Validated on a copy, so a refusal
    /// leaves the player untouched.
    pub fn apply_patch(
        &mut self,
        index: usize,
        patch: PlayerPatch,
        scoring: &ScoringConfig,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), GameError> {
        self.ensure_open()?;
        let mut player = self.players[index].clone();

        if let Some(name) = patch.name.as_deref() {
            player.name = validate_name(name)?;
        }
        if let Some(update) = patch.stage {
            let rules = scoring.effective(update.stage, &self.overrides);
            player.progress.apply_patch(
                update.stage,
                update.patch(),
                rules,
                scoring.attempt_penalty,
            )?;
        }
        if let Some(status) = patch.status {
            if status < player.status {
                return Err(Conflict::StatusRegression.into());
            }
            if status == PlayerStatus::Completed && !player.progress.all_completed() {
                return Err(GameError::Validation(
                    "a player with unfinished stages cannot be completed".to_string(),
                ));
            }
            player.status = status;
        }
        player.refresh();

        let newly_completed = player.status == PlayerStatus::Completed
            && self.players[index].status != PlayerStatus::Completed;
        if newly_completed {
            events.push(SessionEvent::PlayerCompleted {
                slot: player.slot,
                total_score: player.total_score,
            });
        }
        self.players[index] = player;
        self.check_unlock(events);
        Ok(())
    }

    pub fn all_players_complete(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.progress.all_completed())
    }

    /// Assign the unlock code the first time everyone has finished. Never re-derived.
    fn check_unlock(&mut self, events: &mut Vec<SessionEvent>) {
        if self.final_unlock_code.is_some() || !self.all_players_complete() {
            return;
        }
        let code = derive_unlock_code(self.players.iter().map(|p| &p.progress));
        tracing::info!(session = %self.id, "all players complete, unlock code assigned");
        events.push(SessionEvent::UnlockCodeAssigned { code: code.clone() });
        self.final_unlock_code = Some(code);
    }

    pub fn end(&mut self, events: &mut Vec<SessionEvent>) {
        if self.status != SessionStatus::Completed {
            self.status = SessionStatus::Completed;
            events.push(SessionEvent::SessionEnded);
        }
    }

    /// Replace the session's overrides wholesale.
    pub fn set_overrides(&mut self, overrides: PuzzleOverrides) -> Result<(), GameError> {
        self.ensure_open()?;
        overrides.validate()?;
        self.overrides = overrides;
        Ok(())
    }

    fn combat_mut(&mut self) -> Result<&mut CombatState, Conflict> {
        self.combat.as_mut().ok_or(Conflict::NotCombatSession)
    }

    pub fn combat_action(
        &mut self,
        index: usize,
        action: CombatAction,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<Option<ShotResult>, GameError> {
        let slot = self.players[index].slot;
        if action != CombatAction::None {
            self.ensure_open()?;
        }
        if let CombatAction::Move { x, y } | CombatAction::Shoot { x, y } = action {
            if !x.is_finite() || !y.is_finite() {
                return Err(GameError::Validation(
                    "coordinates must be finite numbers".to_string(),
                ));
            }
        }

        let combat = self.combat_mut()?;
        let shot = match action {
            CombatAction::Move { x, y } => {
                combat.move_to(slot, x, y)?;
                None
            }
            CombatAction::Shoot { x, y } => Some(combat.shoot(slot, x, y, now, events)?),
            CombatAction::Reload => {
                combat.reload(slot, now)?;
                None
            }
            CombatAction::None => None,
        };
        self.settle_combat();
        Ok(shot)
    }

    pub fn submit_clue(
        &mut self,
        answer: &str,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<ClueResult, GameError> {
        self.ensure_open()?;
        let result = self.combat_mut()?.submit_clue(answer, now, events)?;
        self.settle_combat();
        Ok(result)
    }

    pub fn combat_admin(
        &mut self,
        action: CombatAdminAction,
        now: Timestamp,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), GameError> {
        self.ensure_open()?;
        let combat = self.combat_mut()?;
        match action {
            CombatAdminAction::Pause => combat.pause(events)?,
            CombatAdminAction::Resume => combat.resume(events)?,
            CombatAdminAction::ForceVictory => {
                combat.force_outcome(CombatPhase::Victory, events)?
            }
            CombatAdminAction::ForceDefeat => combat.force_outcome(CombatPhase::Defeat, events)?,
            CombatAdminAction::AdjustOxygen { seconds } => {
                combat.adjust_oxygen(seconds.saturating_mul(1_000), events)?
            }
            CombatAdminAction::SkipRoom => combat.skip_room(now, events)?,
        }
        self.settle_combat();
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, GameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
        return Err(GameError::Validation(format!(
            "name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
