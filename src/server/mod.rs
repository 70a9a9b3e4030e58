// Relay server: sessions, per-connection readers and the acceptance loop

pub mod manager;
pub mod reader;
pub mod session;

pub use manager::{SessionManager, SessionStatus};
pub use reader::spawn_reader;
pub use session::Session;
