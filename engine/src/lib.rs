pub mod types;
pub mod roles;
pub mod sequence;
pub mod resolve;
pub mod passive;
pub mod night;
pub mod day;
pub mod setup;
pub mod visibility;


pub use types::*;
pub use roles::{night_order, NightSlot, RoleInfo};
pub use night::{NightError, TurnProgress};
pub use day::VoteError;
pub use setup::SetupError;
