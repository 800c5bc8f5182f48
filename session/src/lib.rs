pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod simulate;
pub mod store;

pub use config::SessionConfig;
pub use coordinator::Coordinator;
pub use error::{SessionError, SimulationError, StoreError};
pub use notify::{Envelope, Notifier, RoomChannels, Silent};
pub use simulate::{drive_room, make_agents, run_batch, run_game, seats_for, BatchSummary, GameSummary};
pub use store::{MemoryStore, RoomStore, SqliteStore};
