// Error taxonomy shared by the server and client halves

use std::io;

use thiserror::Error;

use super::protocol::{Message, Slot};

/// Failures of the fixed-width codec
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0} bytes, expected 16")]
    Malformed(usize),
    #[error("stream ended")]
    EndOfStream,
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

/// Outcome of reading one message from a session slot
#[derive(Error, Debug)]
pub enum InputError {
    #[error("player quit")]
    PlayerQuit,
    #[error("stream ended")]
    EndOfStream,
    #[error("transient read error: {0}")]
    Transient(io::Error),
    #[error("stream error: {0}")]
    Stream(io::Error),
    #[error("slot {0} is empty")]
    SlotVacant(Slot),
}

impl From<ProtocolError> for InputError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::EndOfStream | ProtocolError::Malformed(_) => InputError::EndOfStream,
            ProtocolError::Stream(e) if is_transient(&e) => InputError::Transient(e),
            ProtocolError::Stream(e) => InputError::Stream(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("server is not running")]
    NotRunning,
    #[error("stream error: {0}")]
    Stream(#[from] io::Error),
}

/// Failures of the client connect handshake. Display strings are shown to the user.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Server not found")]
    ServerNotFound,
    #[error("Unknown host")]
    UnknownHost,
    #[error("Server is currently full")]
    ServerFull,
    #[error("Disconnected: server shut down")]
    ServerShutDown,
    #[error("Unexpected reply from server: {0}")]
    UnexpectedReply(Message),
    #[error("Connection error: {0}")]
    Stream(io::Error),
}

impl From<ProtocolError> for ConnectError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Stream(e) => ConnectError::Stream(e),
            other => ConnectError::Stream(io::Error::new(io::ErrorKind::UnexpectedEof, other)),
        }
    }
}

/// Conditions that end the client's exchange loop
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("other player quit")]
    PeerQuit,
    #[error("server shut down")]
    ServerShutDown,
    #[error("stream ended")]
    EndOfStream,
    #[error("stream error: {0}")]
    Stream(io::Error),
}

impl From<ProtocolError> for EngineError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::EndOfStream | ProtocolError::Malformed(_) => EngineError::EndOfStream,
            ProtocolError::Stream(e) => EngineError::Stream(e),
        }
    }
}

/// Read errors worth retrying rather than dropping the connection
pub fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let e: InputError = ProtocolError::Stream(io::Error::from(io::ErrorKind::WouldBlock)).into();
        assert!(matches!(e, InputError::Transient(_)));

        let e: InputError =
            ProtocolError::Stream(io::Error::from(io::ErrorKind::ConnectionReset)).into();
        assert!(matches!(e, InputError::Stream(_)));

        let e: InputError = ProtocolError::EndOfStream.into();
        assert!(matches!(e, InputError::EndOfStream));
    }

    #[test]
    fn test_connect_error_messages() {
        assert_eq!(ConnectError::ServerFull.to_string(), "Server is currently full");
        assert_eq!(ConnectError::ServerNotFound.to_string(), "Server not found");
    }
}
