use crate::config::{room, ROOMS};
use crate::world::{CombatState, MonsterId, RoomStats};
use airlock_core::{PlayerSlot, Timestamp};
use airlock_types::{ClueView, CombatView, FighterView, MonsterView, RoomStatsView};
use slotmap::Key;

pub fn monster_id_to_string(id: MonsterId) -> String {
    id.data().as_ffi().to_string()
}

fn room_name(index: usize) -> String {
    room(index).map(|r| r.name).unwrap_or("Unknown").to_string()
}

fn stats_view(stats: &RoomStats, now: Timestamp) -> RoomStatsView {
    let end = stats.cleared_at.unwrap_or(now);
    RoomStatsView {
        room_index: stats.room_index,
        room_name: room_name(stats.room_index),
        kills: stats.kills,
        shots: stats.shots,
        cleared: stats.cleared_at.is_some(),
        elapsed_ms: end.saturating_since(stats.started_at).as_millis(),
    }
}

pub fn build_view(state: &CombatState, now: Timestamp) -> CombatView {
    let room_elapsed_ms = state
        .room_stats
        .last()
        .map(|stats| stats_view(stats, now).elapsed_ms)
        .unwrap_or(0);

    CombatView {
        phase: state.phase,
        paused: state.paused,
        difficulty: state.difficulty,
        room_index: state.room_index,
        room_name: room_name(state.room_index),
        rooms_total: ROOMS.len(),
        oxygen_remaining_ms: state.oxygen_remaining.as_millis(),
        room_elapsed_ms,
        total_kills: state.total_kills,
        monsters: state
            .monsters
            .iter()
            .map(|(id, m)| MonsterView {
                id: monster_id_to_string(id),
                tier: m.tier,
                health: m.health,
                max_health: m.max_health,
                x: m.position.x,
                y: m.position.y,
                radius: m.radius,
                is_boss: m.is_boss,
                boss_phase: m.boss_phase,
                effects: m.effects.clone(),
            })
            .collect(),
        clue: state.clue.as_ref().map(|clue| ClueView {
            scheme: clue.scheme.name().to_string(),
            ciphertext: clue.ciphertext.clone(),
            attempts: clue.attempts,
            max_attempts: clue.max_attempts,
            solved: clue.solved,
        }),
        room_stats: state
            .room_stats
            .iter()
            .map(|stats| stats_view(stats, now))
            .collect(),
    }
}

pub fn fighter_view(state: &CombatState, slot: PlayerSlot, now: Timestamp) -> Option<FighterView> {
    let fighter = state.fighter(slot)?;
    Some(FighterView {
        x: fighter.position.x,
        y: fighter.position.y,
        ammo: fighter.ammo,
        reloading: fighter.is_reloading(now),
        total_shots: fighter.total_shots,
        successful_shots: fighter.successful_shots,
        accuracy: fighter.accuracy(),
        damage_dealt: fighter.damage_dealt,
        damage_taken: fighter.damage_taken,
        kills: fighter.kills,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CombatConfig;
    use airlock_core::Millis;
    use airlock_types::{CombatPhase, Difficulty};

    #[test]
    fn view_hides_the_clue_answer() {
        let mut state = CombatState::new(
            Difficulty::Hard,
            5,
            Millis::from_mins(30),
            CombatConfig::default(),
        );
        state.fighter_mut(0);
        let mut events = Vec::new();
        state.start(Timestamp::from_millis(0), &mut events);
        state
            .skip_room(Timestamp::from_millis(2_000), &mut events)
            .unwrap();

        let view = build_view(&state, Timestamp::from_millis(5_000));
        assert_eq!(view.phase, CombatPhase::RoomClearing);
        assert_eq!(view.room_name, "Cargo Hold");
        assert_eq!(view.rooms_total, 5);
        assert_eq!(view.room_elapsed_ms, 3_000);
        assert_eq!(view.monsters.len(), 6);

        let clue = view.clue.expect("cargo hold has a clue");
        assert_eq!(clue.scheme, "morse");
        assert_eq!(clue.max_attempts, 2);

        let json = serde_json::to_string(&state.clue).unwrap();
        assert!(json.contains("VENT"));
        let view_json = format!("{:?}", build_view(&state, Timestamp::from_millis(5_000)));
        assert!(!view_json.contains("VENT"));
    }

    #[test]
    fn fighter_view_reports_reload_and_accuracy() {
        let mut state = CombatState::new(
            Difficulty::Normal,
            5,
            Millis::from_mins(30),
            CombatConfig::default(),
        );
        let fighter = state.fighter_mut(1);
        fighter.total_shots = 10;
        fighter.successful_shots = 5;
        fighter.reload_until = Some(Timestamp::from_millis(900));

        let view = fighter_view(&state, 1, Timestamp::from_millis(100)).unwrap();
        assert!(view.reloading);
        assert!((view.accuracy - 0.5).abs() < 1e-6);
        assert!(fighter_view(&state, 3, Timestamp::from_millis(100)).is_none());
    }
}
