pub use airlock_core::{Conflict, GameError};
use thiserror::Error;

/// Failure reading or writing the persisted registry.
///
/// Never surfaces to callers of the store; loads degrade to an empty registry
/// and writes are logged.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed state file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported state version {0:?}")]
    Version(Option<u32>),
}

impl From<PersistError> for GameError {
    fn from(err: PersistError) -> Self {
        GameError::Persistence(err.to_string())
    }
}
