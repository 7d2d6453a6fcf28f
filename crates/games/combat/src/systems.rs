use crate::config::{room, CombatConfig, DifficultyConfig, ROOMS, BOSS_TIER};
use crate::world::{ClueGate, CombatState, Fighter, Monster, Position, RoomStats};
use airlock_core::{Millis, Timestamp};
use airlock_types::{CombatPhase, SessionEvent, StatusEffect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROOM_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Distances below this count as already in reach.
const REACH_EPSILON: f32 = 1e-3;

/// Deterministic generator for one room of one session.
pub fn room_rng(seed: u64, room_index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (room_index as u64 + 1).wrapping_mul(ROOM_SEED_MIX))
}

pub fn spawn_monster(
    config: &CombatConfig,
    difficulty: &DifficultyConfig,
    tier: u8,
    position: Position,
    is_boss: bool,
) -> Monster {
    let mut health = config.tier_health(tier, difficulty);
    let mut radius = config.monster_radius;
    if is_boss {
        health = ((health as f32 * config.boss_health_mult).round() as u32).max(1);
        radius = config.boss_radius;
    }
    Monster {
        tier,
        health,
        max_health: health,
        damage: config.tier_damage(tier, difficulty),
        speed: config.tier_speed(tier, difficulty),
        radius,
        position,
        is_boss,
        boss_phase: if is_boss { 1 } else { 0 },
        effects: Vec::new(),
        attack_charge: Millis::ZERO,
    }
}

/// Replace the roster with the current room's monsters and open its stats.
pub fn spawn_room(state: &mut CombatState, now: Timestamp, events: &mut Vec<SessionEvent>) {
    let Some(spec) = room(state.room_index) else {
        return;
    };
    let difficulty = state.difficulty_config();
    let mut rng = room_rng(state.seed, state.room_index);
    let (width, height) = (state.config.arena_width, state.config.arena_height);

    state.monsters.clear();
    let count = difficulty.monster_count(spec.monsters);
    for _ in 0..count {
        let tier = rng.gen_range(spec.min_tier..=spec.max_tier);
        let position = Position::new(
            rng.gen_range(width * 0.1..width * 0.9),
            rng.gen_range(height * 0.55..height * 0.95),
        );
        let monster = spawn_monster(&state.config, &difficulty, tier, position, false);
        state.monsters.insert(monster);
    }

    let mut total = count;
    if spec.boss {
        let position = Position::new(width / 2.0, height * 0.9);
        let boss = spawn_monster(&state.config, &difficulty, BOSS_TIER, position, true);
        state.monsters.insert(boss);
        total += 1;
    }

    state.clue = spec.clue.map(|clue| ClueGate {
        scheme: clue.scheme,
        ciphertext: clue.scheme.encode(clue.plaintext),
        answer: clue.plaintext.to_string(),
        attempts: 0,
        max_attempts: difficulty.clue_attempts,
        solved: false,
    });
    state.room_started_at = Some(now);
    state.room_stats.push(RoomStats {
        room_index: state.room_index,
        kills: 0,
        shots: 0,
        started_at: now,
        cleared_at: None,
    });

    tracing::debug!(room = spec.name, monsters = total, "room entered");
    events.push(SessionEvent::RoomEntered {
        room_index: state.room_index,
        monsters: total,
    });
}

pub fn drain_oxygen(state: &mut CombatState, dt: Millis) {
    state.oxygen_remaining = state.oxygen_remaining.saturating_sub(dt);
}

pub fn finish_reloads(state: &mut CombatState, now: Timestamp) {
    let magazine = state.config.magazine_size;
    for fighter in &mut state.fighters {
        if fighter.reload_until.is_some_and(|until| now >= until) {
            fighter.ammo = magazine;
            fighter.reload_until = None;
        }
    }
}

fn nearest_fighter(fighters: &[Fighter], from: Position) -> Option<(usize, Position)> {
    fighters
        .iter()
        .enumerate()
        .map(|(idx, f)| (idx, f.position, from.distance(f.position)))
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(idx, pos, _)| (idx, pos))
}

/// Move every monster toward its nearest fighter and resolve attacks.
///
/// Attack charge only accrues for the part of `dt` spent within reach, so one
/// long step and many short ones land roughly the same number of attacks.
pub fn update_monsters(state: &mut CombatState, dt: Millis) {
    if state.fighters.is_empty() || dt.is_zero() {
        return;
    }
    let reach = state.config.attack_reach;
    let interval = state.config.attack_interval.as_millis().max(1);
    let dt_secs = dt.as_secs_f32();

    // (fighter index, damage)
    let mut hits: Vec<(usize, u64)> = Vec::new();

    for monster in state.monsters.values_mut() {
        let Some((target_idx, target)) = nearest_fighter(&state.fighters, monster.position)
        else {
            continue;
        };
        let speed = monster.effective_speed();
        let gap = monster.position.distance(target) - reach;

        let travel_ms = if gap <= REACH_EPSILON {
            0
        } else if speed > 0.0 {
            ((gap / speed) * 1000.0).round() as u64
        } else {
            u64::MAX
        };
        monster.position = monster.position.step_toward(target, speed * dt_secs, reach);

        let in_reach_ms = dt.as_millis().saturating_sub(travel_ms);
        if in_reach_ms == 0 {
            continue;
        }
        let charge = monster.attack_charge.as_millis() + in_reach_ms;
        let attacks = charge / interval;
        monster.attack_charge = Millis::from_millis(charge % interval);
        if attacks > 0 {
            hits.push((target_idx, monster.effective_damage() as u64 * attacks));
        }
    }

    let per_damage = state.config.oxygen_per_damage_ms;
    for (idx, damage) in hits {
        state.fighters[idx].damage_taken += damage;
        let drain = Millis::from_millis(damage.saturating_mul(per_damage));
        state.oxygen_remaining = state.oxygen_remaining.saturating_sub(drain);
    }
}

/// Boss phase implied by remaining health: above 66% is phase 1, above 33% is 2.
pub fn boss_phase_for(health: u32, max_health: u32) -> u8 {
    let pct = health as u64 * 100 / max_health.max(1) as u64;
    if pct > 66 {
        1
    } else if pct > 33 {
        2
    } else {
        3
    }
}

/// Advance a boss to the phase its health implies. Returns the new phase if it changed.
pub fn update_boss_phase(monster: &mut Monster) -> Option<u8> {
    if !monster.is_boss {
        return None;
    }
    let phase = boss_phase_for(monster.health, monster.max_health);
    if phase <= monster.boss_phase {
        return None;
    }
    monster.boss_phase = phase;
    monster.effects = match phase {
        2 => vec![StatusEffect::Enraged],
        _ => vec![
            StatusEffect::Enraged,
            StatusEffect::Hasted,
            StatusEffect::Shielded,
        ],
    };
    Some(phase)
}

/// Check terminal conditions and room completion.
pub fn evaluate(state: &mut CombatState, now: Timestamp, events: &mut Vec<SessionEvent>) {
    if state.phase != CombatPhase::RoomClearing {
        return;
    }
    if state.oxygen_remaining.is_zero() {
        set_outcome(state, CombatPhase::Defeat, events);
        return;
    }
    let gated = state.clue.as_ref().is_some_and(|clue| !clue.solved);
    if state.monsters.is_empty() && !gated {
        complete_room(state, now, events);
    }
}

fn complete_room(state: &mut CombatState, now: Timestamp, events: &mut Vec<SessionEvent>) {
    if let Some(stats) = state.current_stats_mut() {
        stats.cleared_at = Some(now);
    }
    events.push(SessionEvent::RoomCleared {
        room_index: state.room_index,
    });

    if state.room_index + 1 >= ROOMS.len() {
        set_outcome(state, CombatPhase::Victory, events);
    } else {
        state.room_index += 1;
        spawn_room(state, now, events);
    }
}

/// Enter a terminal phase. No effect once one is reached.
pub fn set_outcome(state: &mut CombatState, outcome: CombatPhase, events: &mut Vec<SessionEvent>) {
    if state.phase.is_terminal() || !outcome.is_terminal() {
        return;
    }
    state.phase = outcome;
    state.monsters.clear();
    match outcome {
        CombatPhase::Victory => {
            tracing::info!(room = state.room_index, "combat victory");
            events.push(SessionEvent::Victory);
        }
        _ => {
            tracing::info!(room = state.room_index, "combat defeat");
            events.push(SessionEvent::Defeat);
        }
    }
}
