// Configuration module for bomberduel
// Handles loading and managing client and server configuration from a TOML file

pub mod loader;
pub mod types;

pub use loader::{create_default_config, get_config_path, load_config, load_config_from};
pub use types::{ClientConfig, Config, GameConfig, KeyBindings, ServerConfig};
