pub mod errors;
pub mod events;
pub mod observe;
pub mod persistence;
pub mod session;
pub mod session_handle;
pub mod store;
pub mod types;

pub use errors::{Conflict, GameError, PersistError};
pub use events::EventBuffer;
pub use persistence::{RegistryDocument, STATE_VERSION};
pub use session::{GameSession, Player};
pub use session_handle::SessionHandle;
pub use store::SessionStore;
pub use types::{EventCursor, PlayerPatch, ServerEvent, StageUpdate, StoreConfig};
