// Connect handshake and the socket halves the sync engine talks through

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::network::protocol::{read_message, write_message, Message, Sentinel, Slot};
use crate::network::{ConnectError, ProtocolError};

/// Write half shared between the engine thread and a local disconnect
pub type SharedWriter = Arc<Mutex<BufWriter<TcpStream>>>;

pub struct ServerConnection {
    reader: BufReader<TcpStream>,
    writer: SharedWriter,
    stream: TcpStream,
    slot: Slot,
}

impl ServerConnection {
    /// Resolve, connect and read the slot assignment.
    pub fn connect(host: &str, port: u16) -> Result<Self, ConnectError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                debug!("Could not resolve {}: {}", host, e);
                ConnectError::UnknownHost
            })?
            .collect();
        if addrs.is_empty() {
            return Err(ConnectError::UnknownHost);
        }

        let stream = TcpStream::connect(&addrs[..]).map_err(|e| match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut
            | io::ErrorKind::AddrNotAvailable => ConnectError::ServerNotFound,
            _ => ConnectError::Stream(e),
        })?;
        let _ = stream.set_nodelay(true);
        Self::handshake(stream)
    }

    /// Read the assignment from an already open stream
    pub fn handshake(stream: TcpStream) -> Result<Self, ConnectError> {
        let mut reader = BufReader::new(stream.try_clone().map_err(ConnectError::Stream)?);
        let reply = read_message(&mut reader)?;
        let slot = match reply.sentinel() {
            Some(Sentinel::ServerFull) => return Err(ConnectError::ServerFull),
            Some(Sentinel::Kicked) => return Err(ConnectError::ServerShutDown),
            _ => Slot::from_assignment(reply.first()).ok_or(ConnectError::UnexpectedReply(reply))?,
        };
        info!("Connected as player {}", slot);

        let writer = BufWriter::new(stream.try_clone().map_err(ConnectError::Stream)?);
        Ok(Self {
            reader,
            writer: Arc::new(Mutex::new(writer)),
            stream,
            slot,
        })
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn send(&self, message: &Message) -> io::Result<()> {
        send_on(&self.writer, message)
    }

    pub fn read(&mut self) -> Result<Message, ProtocolError> {
        read_message(&mut self.reader)
    }

    pub fn writer(&self) -> SharedWriter {
        self.writer.clone()
    }

    pub fn try_clone_stream(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }

    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

pub fn send_on(writer: &SharedWriter, message: &Message) -> io::Result<()> {
    let mut guard: MutexGuard<'_, BufWriter<TcpStream>> =
        writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    write_message(&mut *guard, message)
}
