pub mod agent;
pub mod random;
pub mod heuristic;

pub use agent::{Agent, Decision};
pub use random::RandomAgent;
pub use heuristic::HeuristicAgent;
