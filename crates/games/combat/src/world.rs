use crate::config::{CombatConfig, DifficultyConfig};
use airlock_core::{Millis, PlayerSlot, Timestamp};
use airlock_puzzle::CipherScheme;
use airlock_types::{CombatPhase, Difficulty, StatusEffect};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! { pub struct MonsterId; }

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Move toward `target` by at most `max_step`, stopping `stop_at` short of it.
    pub fn step_toward(self, target: Position, max_step: f32, stop_at: f32) -> Position {
        let dist = self.distance(target);
        let travel = (dist - stop_at).min(max_step);
        if travel <= 0.0 || dist <= f32::EPSILON {
            return self;
        }
        let t = travel / dist;
        Position {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }

    pub fn clamped(self, width: f32, height: f32) -> Position {
        Position {
            x: self.x.clamp(0.0, width),
            y: self.y.clamp(0.0, height),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Monster {
    pub tier: u8,
    pub health: u32,
    pub max_health: u32,
    pub damage: u32,
    pub speed: f32,
    pub radius: f32,
    pub position: Position,
    pub is_boss: bool,
    /// 1..=3 for bosses, 0 otherwise.
    pub boss_phase: u8,
    pub effects: Vec<StatusEffect>,
    /// Time spent within reach since the last attack.
    pub attack_charge: Millis,
}

impl Monster {
    pub fn has(&self, effect: StatusEffect) -> bool {
        self.effects.contains(&effect)
    }

    pub fn effective_damage(&self) -> u32 {
        if self.has(StatusEffect::Enraged) {
            self.damage + self.damage / 2
        } else {
            self.damage
        }
    }

    pub fn effective_speed(&self) -> f32 {
        if self.has(StatusEffect::Hasted) {
            self.speed * 1.5
        } else {
            self.speed
        }
    }

    pub fn contains(&self, point: Position) -> bool {
        self.position.distance(point) <= self.radius
    }
}

/// A player's combat-side stats, indexed by slot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fighter {
    pub position: Position,
    pub ammo: u32,
    pub reload_until: Option<Timestamp>,
    pub total_shots: u32,
    pub successful_shots: u32,
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub kills: u32,
}

impl Fighter {
    pub fn new(slot: PlayerSlot, config: &CombatConfig) -> Self {
        let spacing = config.arena_width / 5.0;
        Self {
            position: Position::new(spacing * (slot as f32 + 1.0), 10.0),
            ammo: config.magazine_size,
            ..Default::default()
        }
    }

    pub fn accuracy(&self) -> f32 {
        if self.total_shots == 0 {
            0.0
        } else {
            self.successful_shots as f32 / self.total_shots as f32
        }
    }

    pub fn is_reloading(&self, now: Timestamp) -> bool {
        self.reload_until.is_some_and(|until| now < until)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomStats {
    pub room_index: usize,
    pub kills: u32,
    pub shots: u32,
    pub started_at: Timestamp,
    pub cleared_at: Option<Timestamp>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClueGate {
    pub scheme: CipherScheme,
    pub ciphertext: String,
    pub answer: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub solved: bool,
}

impl ClueGate {
    pub fn exhausted(&self) -> bool {
        !self.solved && self.attempts >= self.max_attempts
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombatState {
    #[serde(default)]
    pub config: CombatConfig,
    pub difficulty: Difficulty,
    pub seed: u64,
    pub phase: CombatPhase,
    #[serde(default)]
    pub paused: bool,
    pub room_index: usize,
    pub room_started_at: Option<Timestamp>,
    pub last_tick_at: Option<Timestamp>,
    pub oxygen_remaining: Millis,
    pub monsters: SlotMap<MonsterId, Monster>,
    #[serde(default)]
    pub fighters: Vec<Fighter>,
    #[serde(default)]
    pub room_stats: Vec<RoomStats>,
    #[serde(default)]
    pub total_kills: u32,
    #[serde(default)]
    pub clue: Option<ClueGate>,
}

impl CombatState {
    pub fn new(difficulty: Difficulty, seed: u64, oxygen: Millis, config: CombatConfig) -> Self {
        Self {
            config,
            difficulty,
            seed,
            phase: CombatPhase::Waiting,
            paused: false,
            room_index: 0,
            room_started_at: None,
            last_tick_at: None,
            oxygen_remaining: oxygen,
            monsters: SlotMap::with_key(),
            fighters: Vec::new(),
            room_stats: Vec::new(),
            total_kills: 0,
            clue: None,
        }
    }

    pub fn difficulty_config(&self) -> DifficultyConfig {
        DifficultyConfig::for_difficulty(self.difficulty)
    }

    /// Fighter for `slot`, creating any missing fighters up to it.
    pub fn fighter_mut(&mut self, slot: PlayerSlot) -> &mut Fighter {
        while self.fighters.len() <= slot as usize {
            let next = self.fighters.len() as PlayerSlot;
            self.fighters.push(Fighter::new(next, &self.config));
        }
        &mut self.fighters[slot as usize]
    }

    pub fn fighter(&self, slot: PlayerSlot) -> Option<&Fighter> {
        self.fighters.get(slot as usize)
    }

    pub fn current_stats_mut(&mut self) -> Option<&mut RoomStats> {
        self.room_stats.last_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stops_short_of_target() {
        let from = Position::new(0.0, 0.0);
        let target = Position::new(10.0, 0.0);

        let moved = from.step_toward(target, 3.0, 2.0);
        assert!((moved.x - 3.0).abs() < 1e-5);

        let moved = from.step_toward(target, 100.0, 2.0);
        assert!((moved.x - 8.0).abs() < 1e-5);

        let inside = Position::new(9.0, 0.0).step_toward(target, 5.0, 2.0);
        assert_eq!(inside, Position::new(9.0, 0.0));
    }

    #[test]
    fn accuracy_is_zero_without_shots() {
        let mut fighter = Fighter::default();
        assert_eq!(fighter.accuracy(), 0.0);
        fighter.total_shots = 4;
        fighter.successful_shots = 3;
        assert!((fighter.accuracy() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn fighters_are_created_up_to_slot() {
        let mut state = CombatState::new(
            Difficulty::Normal,
            7,
            Millis::from_mins(45),
            CombatConfig::default(),
        );
        state.fighter_mut(2).kills = 1;
        assert_eq!(state.fighters.len(), 3);
        assert_eq!(state.fighters[0].ammo, 12);
        assert_eq!(state.fighter(2).map(|f| f.kills), Some(1));
    }
}
