use nightfall_engine::{NightError, PlayerId, SetupError, VoteError};
use thiserror::Error;

/// Errors from a room store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room store lock was poisoned")]
    LockPoisoned,

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored room {room} is corrupt: {reason}")]
    Corrupt { room: String, reason: String },
}

/// Errors surfaced by the coordinator to the connection layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),

    #[error("room {0} already exists")]
    RoomExists(String),

    #[error("player {0} is not seated in this room")]
    UnknownPlayer(PlayerId),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Night(#[from] NightError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store task failed: {0}")]
    StoreTask(#[from] tokio::task::JoinError),
}

/// Why a headless game could not be finished.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Night(#[from] NightError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("no agent plays seat {0}")]
    NoAgent(PlayerId),

    #[error("game exceeded {0} decisions without finishing")]
    DecisionLimit(usize),

    #[error("game stuck in phase {0:?}: nobody has anything to do")]
    Stuck(nightfall_engine::PhaseKind),
}
