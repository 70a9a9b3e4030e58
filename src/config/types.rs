// bomberduel configuration types
// Every section has defaults so a partial config file is still valid

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::network::DEFAULT_PORT;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    // Address the relay listens on
    pub bind_address: String,
    pub port: u16,

    // Sessions of two players each; further callers are told the server is full
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_sessions: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,

    // Pause between exchanges while a round is running
    pub tick_interval_ms: u64,

    // Pause between ready attempts while no opponent is connected
    pub wait_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: DEFAULT_PORT,
            tick_interval_ms: 50,
            wait_interval_ms: 250,
        }
    }
}

impl ClientConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    pub player_lives: u32,

    // Time from placing a bomb to the explosion
    pub bomb_fuse_ms: u64,

    // How long the blast stays on the board
    pub blast_duration_ms: u64,

    // Cells reached in each direction from the bomb
    pub blast_radius: usize,

    // Delay per cell of the round-end animation
    pub animation_step_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_lives: 2,
            bomb_fuse_ms: 1000,
            blast_duration_ms: 500,
            blast_radius: 2,
            animation_step_ms: 15,
        }
    }
}

impl GameConfig {
    pub fn bomb_fuse(&self) -> Duration {
        Duration::from_millis(self.bomb_fuse_ms)
    }

    pub fn blast_duration(&self) -> Duration {
        Duration::from_millis(self.blast_duration_ms)
    }

    pub fn animation_step(&self) -> Duration {
        Duration::from_millis(self.animation_step_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyBindings {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub place_bomb: String,
    pub quit: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: "Up".to_string(),
            down: "Down".to_string(),
            left: "Left".to_string(),
            right: "Right".to_string(),
            place_bomb: "Space".to_string(),
            quit: "Q".to_string(),
        }
    }
}
