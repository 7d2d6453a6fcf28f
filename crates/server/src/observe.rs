//! Client-facing views of sessions. Never include answers or tokens of
//! other players.

use crate::session::{GameSession, Player};
use airlock_combat::{build_view, fighter_view};
use airlock_core::Timestamp;
use airlock_puzzle::ScoringConfig;
use airlock_types::{
    PlayerSnapshot, PlayerSummary, SessionSnapshot, SessionSummary, StageId, StageView,
    StatusResponse,
};

fn stage_view(
    session: &GameSession,
    player: &Player,
    stage: StageId,
    scoring: &ScoringConfig,
) -> StageView {
    let puzzle = player.assignment.get(stage);
    let progress = player.progress.stage(stage);
    StageView {
        stage,
        kind: puzzle.kind_name().to_string(),
        prompt: puzzle.prompt().to_string(),
        options: puzzle.options().to_vec(),
        unlocked: player.progress.is_unlocked(stage),
        attempts: progress.attempts,
        max_attempts: scoring.effective(stage, &session.overrides).max_attempts,
        completed: progress.completed,
        score: progress.score,
    }
}

pub fn player_snapshot(
    session: &GameSession,
    index: usize,
    scoring: &ScoringConfig,
    now: Timestamp,
) -> PlayerSnapshot {
    let player = &session.players[index];
    PlayerSnapshot {
        name: player.name.clone(),
        slot: player.slot,
        status: player.status,
        total_score: player.total_score,
        stages: StageId::ALL
            .into_iter()
            .map(|stage| stage_view(session, player, stage, scoring))
            .collect(),
        combat: session
            .combat
            .as_ref()
            .and_then(|combat| fighter_view(combat, player.slot, now)),
    }
}

pub fn session_snapshot(session: &GameSession, now: Timestamp) -> SessionSnapshot {
    SessionSnapshot {
        id: session.id.to_string(),
        join_code: session.join_code.to_string(),
        status: session.status,
        mode: session.mode,
        players: session
            .players
            .iter()
            .map(|p| PlayerSummary {
                name: p.name.clone(),
                slot: p.slot,
                status: p.status,
                total_score: p.total_score,
            })
            .collect(),
        deadline_minutes: session.effective_deadline_minutes(),
        start_time_ms: session.start_time.map(Timestamp::as_millis),
        remaining_ms: session.remaining_time(now).as_millis(),
        expired: session.is_expired(now),
        final_unlock_code: session.final_unlock_code.clone(),
        combat: session.combat.as_ref().map(|combat| build_view(combat, now)),
        created_at_ms: session.created_at.as_millis(),
    }
}

pub fn status_response(
    session: &GameSession,
    index: usize,
    scoring: &ScoringConfig,
    now: Timestamp,
) -> StatusResponse {
    StatusResponse {
        player: player_snapshot(session, index, scoring, now),
        session: session_snapshot(session, now),
    }
}

pub fn session_summary(session: &GameSession) -> SessionSummary {
    SessionSummary {
        id: session.id.to_string(),
        join_code: session.join_code.to_string(),
        status: session.status,
        mode: session.mode,
        player_count: session.players.len() as u8,
        created_at_ms: session.created_at.as_millis(),
        final_unlock_code: session.final_unlock_code.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_combat::CombatConfig;
    use airlock_core::{JoinCode, OwnerId, PlayerToken, SessionId};
    use airlock_puzzle::PuzzleContent;
    use airlock_types::SessionMode;

    #[test]
    fn snapshots_never_leak_answers() {
        let mut session = GameSession::new(
            SessionId::generate(),
            JoinCode::parse("MNP234").unwrap(),
            OwnerId::new("owner"),
            SessionMode::Puzzle,
            45,
            &CombatConfig::default(),
            Timestamp::from_millis(0),
        );
        let content = PuzzleContent::default();
        session
            .add_player(
                PlayerToken::generate(),
                "Ada",
                &content,
                Timestamp::from_millis(0),
                &mut Vec::new(),
            )
            .unwrap();

        let view = status_response(
            &session,
            0,
            &ScoringConfig::default(),
            Timestamp::from_millis(1_000),
        );
        assert_eq!(view.player.stages.len(), 4);
        assert!(view.player.stages[0].unlocked);
        assert!(!view.player.stages[1].unlocked);
        assert_eq!(view.player.stages[0].max_attempts, 5);
        assert_eq!(view.session.start_time_ms, Some(0));
        assert!(!view.session.expired);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains(&session.players[0].token.to_string()));
        assert!(!json.contains(&content.decode_words[0]));
        assert!(!json.contains(&content.translate_phrases[0]));
        assert!(!json.contains("footsteps"));
    }
}
