use thiserror::Error;

/// Expected, recoverable refusals of a state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("session is full")]
    GameFull,
    #[error("session has already completed")]
    GameCompleted,
    #[error("stage has already been completed")]
    StageAlreadyCompleted,
    #[error("previous stage has not been completed")]
    StageLocked,
    #[error("session deadline has expired")]
    DeadlineExpired,
    #[error("session is not a combat session")]
    NotCombatSession,
    #[error("session has not started")]
    NotStarted,
    #[error("session is paused")]
    Paused,
    #[error("weapon is empty")]
    NoAmmo,
    #[error("weapon is reloading")]
    Reloading,
    #[error("room has no clue to solve")]
    NoClue,
    #[error("clue has already been solved")]
    ClueAlreadySolved,
    #[error("cannot skip the final room")]
    FinalRoom,
    #[error("status cannot move backwards")]
    StatusRegression,
    #[error("progress cannot move backwards")]
    ProgressRegression,
}

/// Error taxonomy shared by every crate in the workspace.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not authorized to administer this session")]
    Unauthorized,
    #[error(transparent)]
    Conflict(#[from] Conflict),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl GameError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::Unauthorized => "unauthorized",
            GameError::Conflict(_) => "conflict",
            GameError::Validation(_) => "validation",
            GameError::Persistence(_) => "persistence",
        }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
