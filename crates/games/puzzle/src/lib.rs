//! Puzzle and progress rules: pure functions over stage content and a
//! player's progress. No clocks, no locks, no I/O.

pub mod cipher;
pub mod config;
pub mod content;
pub mod progress;
pub mod scoring;
pub mod stage;

pub use cipher::CipherScheme;
pub use config::{PuzzleOverrides, ScoringConfig, StageRules};
pub use content::{PuzzleAssignment, PuzzleContent, Riddle, TriviaQuestion};
pub use progress::{AnswerOutcome, PlayerProgress, StagePatch, StageProgress};
pub use scoring::{compute_stage_score, derive_unlock_code};
pub use stage::{check_answer, normalize, StagePuzzle};
