// Networking primitives shared by the relay server and the game client

pub mod error;
pub mod protocol;

pub use error::{ConnectError, EngineError, InputError, ProtocolError, ServerError};
pub use protocol::{read_message, write_message, Message, Sentinel, Slot, DEFAULT_PORT};
