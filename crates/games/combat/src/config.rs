use airlock_core::Millis;
use airlock_puzzle::CipherScheme;
use airlock_types::Difficulty;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub health_mult: f32,
    pub damage_mult: f32,
    pub speed_mult: f32,
    pub count_mult: f32,
    /// Shared wrong-answer pool for a room's clue gate.
    pub clue_attempts: u32,
}

impl DifficultyConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                health_mult: 0.75,
                damage_mult: 0.6,
                speed_mult: 0.85,
                count_mult: 0.75,
                clue_attempts: 5,
            },
            Difficulty::Normal => Self {
                health_mult: 1.0,
                damage_mult: 1.0,
                speed_mult: 1.0,
                count_mult: 1.0,
                clue_attempts: 3,
            },
            Difficulty::Hard => Self {
                health_mult: 1.3,
                damage_mult: 1.4,
                speed_mult: 1.15,
                count_mult: 1.5,
                clue_attempts: 2,
            },
        }
    }

    /// Scaled roster size, never below one.
    pub fn monster_count(&self, base: u32) -> u32 {
        ((base as f32 * self.count_mult).round() as u32).max(1)
    }
}

/// Cipher side-puzzle guarding a room exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClueSpec {
    pub scheme: CipherScheme,
    pub plaintext: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomSpec {
    pub name: &'static str,
    pub monsters: u32,
    pub min_tier: u8,
    pub max_tier: u8,
    pub boss: bool,
    pub clue: Option<ClueSpec>,
}

pub const BOSS_TIER: u8 = 5;

pub const ROOMS: [RoomSpec; 5] = [
    RoomSpec {
        name: "Docking Bay",
        monsters: 3,
        min_tier: 1,
        max_tier: 1,
        boss: false,
        clue: None,
    },
    RoomSpec {
        name: "Cargo Hold",
        monsters: 4,
        min_tier: 1,
        max_tier: 2,
        boss: false,
        clue: Some(ClueSpec {
            scheme: CipherScheme::Morse,
            plaintext: "VENT",
        }),
    },
    RoomSpec {
        name: "Hydroponics",
        monsters: 4,
        min_tier: 2,
        max_tier: 3,
        boss: false,
        clue: None,
    },
    RoomSpec {
        name: "Reactor Core",
        monsters: 5,
        min_tier: 3,
        max_tier: 4,
        boss: false,
        clue: Some(ClueSpec {
            scheme: CipherScheme::Caesar { shift: 5 },
            plaintext: "COOLANT",
        }),
    },
    RoomSpec {
        name: "Bridge",
        monsters: 2,
        min_tier: 3,
        max_tier: 4,
        boss: true,
        clue: Some(ClueSpec {
            scheme: CipherScheme::Atbash,
            plaintext: "OVERRIDE",
        }),
    },
];

pub fn room(index: usize) -> Option<&'static RoomSpec> {
    ROOMS.get(index)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub arena_width: f32,
    pub arena_height: f32,

    // Weapon
    pub magazine_size: u32,
    pub reload_time: Millis,
    pub weapon_damage: u32,

    // Monsters
    pub attack_interval: Millis,
    pub attack_reach: f32,
    /// Oxygen lost per point of monster damage.
    pub oxygen_per_damage_ms: u64,
    pub base_health: u32,
    pub base_damage: u32,
    /// Arena units per second.
    pub base_speed: f32,
    pub monster_radius: f32,
    pub boss_health_mult: f32,
    pub boss_radius: f32,
}

impl CombatConfig {
    pub fn tier_health(&self, tier: u8, difficulty: &DifficultyConfig) -> u32 {
        let scaled = self.base_health as f32
            * 1.6f32.powi(tier as i32 - 1)
            * difficulty.health_mult;
        (scaled.round() as u32).max(1)
    }

    pub fn tier_damage(&self, tier: u8, difficulty: &DifficultyConfig) -> u32 {
        let scaled = self.base_damage as f32
            * 1.4f32.powi(tier as i32 - 1)
            * difficulty.damage_mult;
        (scaled.round() as u32).max(1)
    }

    pub fn tier_speed(&self, tier: u8, difficulty: &DifficultyConfig) -> f32 {
        self.base_speed * 1.1f32.powi(tier as i32 - 1) * difficulty.speed_mult
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            arena_width: 100.0,
            arena_height: 100.0,

            magazine_size: 12,
            reload_time: Millis::from_millis(1_500),
            weapon_damage: 25,

            attack_interval: Millis::from_secs(1),
            attack_reach: 6.0,
            oxygen_per_damage_ms: 200,
            base_health: 40,
            base_damage: 4,
            base_speed: 6.0,
            monster_radius: 3.0,
            boss_health_mult: 3.0,
            boss_radius: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_scale_geometrically() {
        let config = CombatConfig::default();
        let normal = DifficultyConfig::for_difficulty(Difficulty::Normal);

        assert_eq!(config.tier_health(1, &normal), 40);
        assert_eq!(config.tier_health(2, &normal), 64);
        assert_eq!(config.tier_damage(1, &normal), 4);
        assert_eq!(config.tier_damage(3, &normal), 8);
        assert!((config.tier_speed(2, &normal) - 6.6).abs() < 1e-4);
    }

    #[test]
    fn difficulty_scales_counts_and_stats() {
        let config = CombatConfig::default();
        let easy = DifficultyConfig::for_difficulty(Difficulty::Easy);
        let hard = DifficultyConfig::for_difficulty(Difficulty::Hard);

        assert_eq!(easy.monster_count(3), 2);
        assert_eq!(hard.monster_count(3), 5);
        assert_eq!(hard.monster_count(0), 1);
        assert!(config.tier_health(1, &easy) < config.tier_health(1, &hard));
    }

    #[test]
    fn only_the_last_room_has_a_boss() {
        assert_eq!(ROOMS.len(), 5);
        assert!(ROOMS[..4].iter().all(|r| !r.boss));
        assert!(ROOMS[4].boss);
        assert_eq!(room(0).map(|r| r.monsters), Some(3));
        assert!(room(5).is_none());
    }
}
