// Wire protocol for bomberduel
// Every message is four big-endian i32 values; control signals repeat one sentinel in all four fields

use std::fmt;
use std::io::{self, Read, Write};

use super::error::ProtocolError;

/// Number of integers in every message
pub const FIELDS: usize = 4;

/// Encoded size of a message in bytes
pub const MESSAGE_LEN: usize = FIELDS * 4;

/// Default server port
pub const DEFAULT_PORT: u16 = 3012;

/// Reserved negative values that multiplex control information onto the data channel.
/// Gameplay coordinates are always non-negative, so the two spaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Sentinel {
    Player1 = -1,
    Player2 = -2,
    Draw = -3,
    Continue = -4,
    Kicked = -5,
    ServerFull = -6,
    PlayerLeftSession = -7,
    OtherPlayerReady = -8,
    NoBomb = -9,
    OtherPlayerNotReady = -10,
    PlayerWon = -11,
    PlayerHit = -12,
}

impl Sentinel {
    pub const ALL: [Sentinel; 12] = [
        Sentinel::Player1,
        Sentinel::Player2,
        Sentinel::Draw,
        Sentinel::Continue,
        Sentinel::Kicked,
        Sentinel::ServerFull,
        Sentinel::PlayerLeftSession,
        Sentinel::OtherPlayerReady,
        Sentinel::NoBomb,
        Sentinel::OtherPlayerNotReady,
        Sentinel::PlayerWon,
        Sentinel::PlayerHit,
    ];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.value() == value)
    }
}

/// One of the two player positions in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::One, Slot::Two];

    /// Index into a session's slot table
    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Slot::One),
            1 => Some(Slot::Two),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    /// Sentinel the server sends when a connection is placed in this slot
    pub fn assignment_sentinel(self) -> Sentinel {
        match self {
            Slot::One => Sentinel::Player1,
            Slot::Two => Sentinel::Player2,
        }
    }

    pub fn from_assignment(value: i32) -> Option<Self> {
        match Sentinel::from_i32(value)? {
            Sentinel::Player1 => Some(Slot::One),
            Sentinel::Player2 => Some(Slot::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::One => write!(f, "1"),
            Slot::Two => write!(f, "2"),
        }
    }
}

/// A single protocol message: `(posX, posY, bombX, bombY)` or a repeated sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message(pub [i32; FIELDS]);

impl Message {
    pub fn new(fields: [i32; FIELDS]) -> Self {
        Self(fields)
    }

    /// A control message: the sentinel repeated in every field
    pub fn control(sentinel: Sentinel) -> Self {
        Self([sentinel.value(); FIELDS])
    }

    /// Position update, with NOBOMB in the bomb fields when no bomb was armed
    pub fn gameplay(pos: (i32, i32), bomb: Option<(i32, i32)>) -> Self {
        let (bx, by) = bomb.unwrap_or((Sentinel::NoBomb.value(), Sentinel::NoBomb.value()));
        Self([pos.0, pos.1, bx, by])
    }

    pub fn fields(&self) -> [i32; FIELDS] {
        self.0
    }

    pub fn first(&self) -> i32 {
        self.0[0]
    }

    /// True when any field carries the given sentinel
    pub fn contains(&self, sentinel: Sentinel) -> bool {
        self.0.iter().any(|&v| v == sentinel.value())
    }

    /// True when this is the uniform control message for `sentinel`
    pub fn is_control(&self, sentinel: Sentinel) -> bool {
        self.0.iter().all(|&v| v == sentinel.value())
    }

    /// Sentinel carried by the first field, if it is one
    pub fn sentinel(&self) -> Option<Sentinel> {
        Sentinel::from_i32(self.first())
    }

    pub fn position(&self) -> (i32, i32) {
        (self.0[0], self.0[1])
    }

    /// Bomb coordinates, or `None` when either field is NOBOMB
    pub fn bomb(&self) -> Option<(i32, i32)> {
        let no_bomb = Sentinel::NoBomb.value();
        if self.0[2] == no_bomb || self.0[3] == no_bomb {
            None
        } else {
            Some((self.0[2], self.0[3]))
        }
    }

    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        let mut buf = [0u8; MESSAGE_LEN];
        for (chunk, value) in buf.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        buf
    }

    /// Decode from a byte slice. Fewer than sixteen bytes is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MESSAGE_LEN {
            return Err(ProtocolError::Malformed(bytes.len()));
        }
        let mut fields = [0i32; FIELDS];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(chunk);
            *field = i32::from_be_bytes(raw);
        }
        Ok(Self(fields))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "({}, {}, {}, {})", a, b, c, d)
    }
}

/// Write one message and flush.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    writer.write_all(&message.encode())?;
    writer.flush()
}

/// Read exactly one message. A stream that ends part way through is `EndOfStream`.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Message, ProtocolError> {
    let mut buf = [0u8; MESSAGE_LEN];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::EndOfStream
        } else {
            ProtocolError::Stream(e)
        }
    })?;
    Message::decode(&buf)
}
