//! Server configuration from environment variables.
//!
//! Every knob has a default so the server runs with an empty environment,
//! backed by the in-memory store. Setting `DATABASE_URL` switches to Postgres.

use canvas::doc::MIN_BOARD_ID_LEN;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_RELAY_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Per-subscriber buffer of undelivered relay events.
    pub relay_channel_capacity: usize,
    /// Length of generated board codes. Never below [`MIN_BOARD_ID_LEN`].
    pub board_id_length: usize,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            relay_channel_capacity: env_parse("RELAY_CHANNEL_CAPACITY", DEFAULT_RELAY_CHANNEL_CAPACITY).max(1),
            board_id_length: env_parse("BOARD_ID_LENGTH", MIN_BOARD_ID_LEN).max(MIN_BOARD_ID_LEN),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            relay_channel_capacity: DEFAULT_RELAY_CHANNEL_CAPACITY,
            board_id_length: MIN_BOARD_ID_LEN,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
