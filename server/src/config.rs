//! Server and game configuration

use shared::{DEFAULT_ROUNDS, MAX_PLAYERS, MAX_ROUNDS, MIN_PLAYERS};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max players must be between {} and {}, got {0}", MIN_PLAYERS, MAX_PLAYERS)]
    MaxPlayers(usize),
    #[error("default rounds must be between 1 and {}, got {0}", MAX_ROUNDS)]
    DefaultRounds(u32),
    #[error("max connections must be at least 1")]
    MaxConnections,
    #[error("client timeout must be non-zero")]
    ClientTimeout,
}

/// Settings applied to newly created rooms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub default_rounds: u32,
    pub max_players: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_rounds: DEFAULT_ROUNDS,
            max_players: MAX_PLAYERS,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(ConfigError::MaxPlayers(self.max_players));
        }
        if !(1..=MAX_ROUNDS).contains(&self.default_rounds) {
            return Err(ConfigError::DefaultRounds(self.default_rounds));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_connections: usize,
    /// Connections silent for longer than this are dropped
    pub client_timeout: Duration,
    /// How often the server logs room and participant counts
    pub status_interval: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_connections: 256,
            client_timeout: Duration::from_secs(30),
            status_interval: Duration::from_secs(60),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        if self.max_connections == 0 {
            return Err(ConfigError::MaxConnections);
        }
        if self.client_timeout.is_zero() {
            return Err(ConfigError::ClientTimeout);
        }
        Ok(())
    }
}
