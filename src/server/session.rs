// Two-slot relay session
// Owns up to two peer connections and forwards messages between them

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::network::protocol::{read_message, write_message, Message, Sentinel, Slot};
use crate::network::InputError;

/// Called once a stopped session has no occupied slots left
pub type EmptyCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// One accepted connection with its decode and encode endpoints.
///
/// The read half is only ever touched by the slot's reader thread; the write half is
/// shared between the peer's reader (forwarding) and shutdown (kicking).
pub struct PeerConnection {
    reader: Mutex<BufReader<TcpStream>>,
    writer: Mutex<BufWriter<TcpStream>>,
    stream: TcpStream,
    addr: SocketAddr,
    kicked: AtomicBool,
}

impl PeerConnection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let addr = stream.peer_addr()?;
        Ok(Self {
            reader: Mutex::new(BufReader::new(stream.try_clone()?)),
            writer: Mutex::new(BufWriter::new(stream.try_clone()?)),
            stream,
            addr,
            kicked: AtomicBool::new(false),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn read(&self) -> Result<Message, InputError> {
        let mut reader = lock(&self.reader);
        Ok(read_message(&mut *reader)?)
    }

    fn write(&self, message: &Message) -> io::Result<()> {
        let mut writer = lock(&self.writer);
        write_message(&mut *writer, message)
    }

    /// Send KICKED once; later calls are no-ops
    fn kick(&self) {
        if self.kicked.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.write(&Message::control(Sentinel::Kicked)) {
            debug!("Could not send KICKED to {}: {}", self.addr, e);
        }
    }

    /// Unblock a reader waiting on this connection
    fn shutdown_read(&self) {
        let _ = self.stream.shutdown(Shutdown::Read);
    }

    fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// A bounded pairing of two slots.
///
/// Slot occupancy is guarded by one lock; reads and writes on a connection happen with
/// that lock released so a blocked reader never stalls the other slot.
pub struct Session {
    id: usize,
    slots: Mutex<[Option<Arc<PeerConnection>>; 2]>,
    running: AtomicBool,
    on_empty: EmptyCallback,
}

impl Session {
    pub fn new(id: usize, on_empty: EmptyCallback) -> Self {
        Self {
            id,
            slots: Mutex::new([None, None]),
            running: AtomicBool::new(true),
            on_empty,
        }
    }

    /// Session without an owner to notify, handy for tests and tools
    pub fn detached(id: usize) -> Self {
        Self::new(id, Arc::new(|_| {}))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Place a connection in the lowest free slot.
    pub fn add_player(&self, stream: TcpStream) -> io::Result<Slot> {
        let peer = Arc::new(PeerConnection::new(stream)?);
        let mut slots = lock(&self.slots);
        let index = slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "session is full"))?;
        slots[index] = Some(peer);
        Slot::from_index(index).ok_or_else(|| io::Error::new(io::ErrorKind::Other, "bad slot"))
    }

    /// Slot the next connection would receive
    pub fn get_player_num(&self) -> Slot {
        if lock(&self.slots)[0].is_none() {
            Slot::One
        } else {
            Slot::Two
        }
    }

    /// Read one message from a slot.
    ///
    /// A message carrying PLAYERLEFTSESSION in any field is reported as `PlayerQuit`.
    pub fn get_player_input(&self, slot: Slot) -> Result<Message, InputError> {
        let peer = self.peer(slot).ok_or(InputError::SlotVacant(slot))?;
        let message = peer.read()?;
        if message.contains(Sentinel::PlayerLeftSession) {
            return Err(InputError::PlayerQuit);
        }
        Ok(message)
    }

    /// Best-effort write; a broken peer is noticed by its own reader.
    pub fn send_player_data(&self, message: &Message, slot: Slot) {
        if let Some(peer) = self.peer(slot) {
            if let Err(e) = peer.write(message) {
                debug!("Session {}: send to slot {} failed: {}", self.id, slot, e);
            }
        }
    }

    pub fn is_max_players(&self) -> bool {
        lock(&self.slots).iter().all(Option::is_some)
    }

    pub fn is_occupied(&self, slot: Slot) -> bool {
        lock(&self.slots)[slot.index()].is_some()
    }

    pub fn player_count(&self) -> usize {
        lock(&self.slots).iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.player_count() == 0
    }

    pub fn peer_addr(&self, slot: Slot) -> Option<SocketAddr> {
        self.peer(slot).map(|p| p.addr())
    }

    /// Evict a slot and close its connection. Returns false if it was already empty.
    pub fn remove_player(&self, slot: Slot) -> bool {
        let removed = lock(&self.slots)[slot.index()].take();
        match removed {
            Some(peer) => {
                peer.close();
                true
            }
            None => false,
        }
    }

    /// Remove a slot and notify the owner if that left the session empty
    pub fn stop_session(&self, slot: Slot) {
        self.remove_player(slot);
        if self.is_empty() {
            debug!("Session {} has no players left", self.id);
            (self.on_empty)(self.id);
        }
    }

    /// Send KICKED to a slot at most once
    pub fn kick(&self, slot: Slot) {
        if let Some(peer) = self.peer(slot) {
            peer.kick();
        }
    }

    /// Stop the session: kick every occupied slot and unblock their readers.
    pub fn disconnect_players(&self) {
        self.running.store(false, Ordering::SeqCst);
        let peers: Vec<Arc<PeerConnection>> = lock(&self.slots).iter().flatten().cloned().collect();
        for peer in &peers {
            info!("Session {}: kicking {}", self.id, peer.addr());
            peer.kick();
            peer.shutdown_read();
        }
    }

    /// Quit cleanup: tell a present opponent, then free the slot.
    pub fn disconnect_player(&self, slot: Slot) {
        if self.is_max_players() {
            self.send_player_data(&Message::control(Sentinel::PlayerLeftSession), slot.other());
        }
        info!("Session {}: player {} quit", self.id, slot);
        if !self.remove_player(slot) {
            warn!("Session {}: slot {} was already empty", self.id, slot);
        }
    }

    fn peer(&self, slot: Slot) -> Option<Arc<PeerConnection>> {
        lock(&self.slots)[slot.index()].clone()
    }
}

/// Poisoning only happens if another thread panicked mid-update; the slot table is
/// still structurally valid, so keep going.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
