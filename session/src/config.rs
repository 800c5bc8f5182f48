use std::env;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Runtime settings for a session host. Read from the environment (after
/// `.env` is loaded by the binary); CLI flags override individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// SQLite file. None = keep rooms in memory.
    pub database: Option<String>,
    /// Buffered notices per room before slow subscribers start lagging.
    pub channel_capacity: usize,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            database: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let channel_capacity = match get("NIGHTFALL_CHANNEL_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid NIGHTFALL_CHANNEL_CAPACITY");
                    defaults.channel_capacity
                }
            },
            None => defaults.channel_capacity,
        };

        SessionConfig {
            database: get("NIGHTFALL_DB").filter(|s| !s.trim().is_empty()),
            channel_capacity,
            log_filter: get("NIGHTFALL_LOG").unwrap_or(defaults.log_filter),
        }
    }
}
