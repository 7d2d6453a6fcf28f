pub mod error;
pub mod time;
pub mod types;

pub use error::{Conflict, GameError, Result};
pub use time::{Clock, ManualClock, Millis, SystemClock, Timestamp};
pub use types::{
    JoinCode, OwnerId, PlayerSlot, PlayerToken, SessionId, JOIN_CODE_ALPHABET, JOIN_CODE_LEN,
    MAX_PLAYERS,
};
