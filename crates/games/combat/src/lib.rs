//! Room-by-room combat run. Time only moves when the owner calls
//! [`CombatState::advance`]; there is no background loop.

pub mod config;
pub mod game;
pub mod observe;
pub mod systems;
pub mod world;

pub use config::{CombatConfig, DifficultyConfig, RoomSpec, ROOMS};
pub use observe::{build_view, fighter_view};
pub use world::{ClueGate, CombatState, Fighter, Monster, MonsterId, Position, RoomStats};
