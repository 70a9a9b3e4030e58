// Session manager and acceptance loop
// Accepts connections, fills sessions in creation order and turns callers away once every slot is taken

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::reader::spawn_reader;
use super::session::Session;
use crate::network::protocol::{write_message, Message, Sentinel, Slot};
use crate::network::ServerError;

/// Sessions plus the accept socket they are fed from.
///
/// Shared between the acceptance loop, reader threads (through each session's empty
/// callback) and whoever stops the server.
pub struct SessionManager {
    bind_addr: SocketAddr,
    max_sessions: usize,
    sessions: Mutex<Vec<Arc<Session>>>,
    running: AtomicBool,
    listener: Mutex<Option<Arc<TcpListener>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    next_session_id: AtomicUsize,
    me: Weak<SessionManager>,
}

/// Occupancy snapshot for the operator `status` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: usize,
    pub players: Vec<SocketAddr>,
}

impl SessionManager {
    pub fn new(bind_addr: SocketAddr, max_sessions: usize) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            bind_addr,
            max_sessions,
            sessions: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            next_session_id: AtomicUsize::new(0),
            me: me.clone(),
        })
    }

    /// Open the accept socket. Returns the bound address (useful with port 0).
    pub fn start(&self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.bind_addr)?;
        let addr = listener.local_addr()?;
        *lock(&self.listener) = Some(Arc::new(listener));
        *lock(&self.local_addr) = Some(addr);
        self.running.store(true, Ordering::SeqCst);
        info!("Server started on {}", addr);
        Ok(addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Register a new empty session if below the maximum.
    pub fn create_session(&self) -> Result<bool, ServerError> {
        if !self.is_running() {
            return Err(ServerError::NotRunning);
        }
        let mut sessions = lock(&self.sessions);
        if sessions.len() >= self.max_sessions {
            debug!("Session not created: {} already open", sessions.len());
            return Ok(false);
        }
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let me = self.me.clone();
        let session = Session::new(
            id,
            Arc::new(move |id| {
                if let Some(manager) = me.upgrade() {
                    manager.session_emptied(id);
                }
            }),
        );
        sessions.push(Arc::new(session));
        info!("Session {} created", id);
        if sessions.len() == self.max_sessions {
            info!("Max sessions reached ({})", self.max_sessions);
        }
        Ok(true)
    }

    /// Accept one connection and place it in the oldest session with a free slot.
    ///
    /// Returns `None` when no session could take the connection or the server was
    /// stopped while waiting.
    pub fn connect_player(&self) -> Result<Option<(Arc<Session>, Slot)>, ServerError> {
        let Some((stream, addr)) = self.accept()? else {
            return Ok(None);
        };

        let Some(session) = self.first_open_session() else {
            info!("No session available for {}", addr);
            return Ok(None);
        };

        let slot = session.get_player_num();
        let mut out = &stream;
        if let Err(e) = write_message(&mut out, &Message::control(slot.assignment_sentinel())) {
            warn!("Could not assign {} to a slot: {}", addr, e);
            return Ok(None);
        }

        let added = match session.add_player(stream) {
            Ok(added) => added,
            Err(e) => {
                warn!("Could not seat {}: {}", addr, e);
                return Ok(None);
            }
        };
        // Lost a race with stop_server: the session was kicked before this seat landed
        if !session.is_running() {
            info!("Session {} stopped before {} was seated", session.id(), addr);
            session.kick(added);
            session.stop_session(added);
            return Ok(None);
        }
        if added != slot {
            warn!("Player {} announced as {} but seated as {}", addr, slot, added);
        }
        info!("Player {} joined session {} from {}", added, session.id(), addr);
        if session.is_max_players() {
            info!("Session {} has max players", session.id());
        }
        if self.is_sessions_full() {
            info!("Max players reached");
        }

        if let Err(e) = spawn_reader(session.clone(), added) {
            warn!("Could not start reader for {}: {}", addr, e);
            session.remove_player(added);
            return Ok(None);
        }
        Ok(Some((session, added)))
    }

    /// Accept one connection and tell it the server is full. False only if accept failed.
    pub fn stop_connecting_players(&self) -> bool {
        let (stream, addr) = match self.accept() {
            Ok(Some(accepted)) => accepted,
            Ok(None) => return true,
            Err(e) => {
                warn!("Accept failed: {}", e);
                return false;
            }
        };
        let mut out = &stream;
        if let Err(e) = write_message(&mut out, &Message::control(Sentinel::ServerFull)) {
            debug!("Could not tell {} the server is full: {}", addr, e);
        }
        info!("User rejected: server full ({})", addr);
        true
    }

    /// Every session exists and every one is full
    pub fn is_sessions_full(&self) -> bool {
        let sessions = lock(&self.sessions);
        sessions.len() == self.max_sessions && sessions.iter().all(|s| s.is_max_players())
    }

    pub fn is_max_sessions(&self) -> bool {
        lock(&self.sessions).len() == self.max_sessions
    }

    /// True if the first session is full, or there are no sessions yet
    pub fn first_session_full(&self) -> bool {
        lock(&self.sessions)
            .first()
            .map_or(true, |s| s.is_max_players())
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        lock(&self.sessions).clone()
    }

    pub fn status(&self) -> Vec<SessionStatus> {
        self.sessions()
            .iter()
            .map(|s| SessionStatus {
                id: s.id(),
                players: Slot::BOTH.iter().filter_map(|&slot| s.peer_addr(slot)).collect(),
            })
            .collect()
    }

    /// Kick everyone, drop all sessions and close the accept socket.
    pub fn stop_server(&self) {
        self.running.store(false, Ordering::SeqCst);
        let sessions: Vec<Arc<Session>> = lock(&self.sessions).drain(..).collect();
        for session in &sessions {
            session.disconnect_players();
        }
        self.release_listener();
        self.wake_acceptor();
        info!("Server stopped");
    }

    /// Acceptance loop. Runs on the calling thread until the server stops.
    pub fn run(&self) -> Result<(), ServerError> {
        let result = self.accept_loop();
        self.running.store(false, Ordering::SeqCst);
        match result {
            Ok(()) | Err(ServerError::NotRunning) => {
                info!("Acceptance loop finished");
                Ok(())
            }
            Err(e) => {
                error!("Acceptance loop stopped: {}", e);
                Err(e)
            }
        }
    }

    fn accept_loop(&self) -> Result<(), ServerError> {
        while self.is_running() {
            if !self.is_max_sessions() && self.all_sessions_full() {
                self.create_session()?;
            }

            if !self.is_sessions_full() {
                self.connect_player()?;
            } else if !self.stop_connecting_players() {
                break;
            }
        }
        Ok(())
    }

    /// No session has a free slot (vacuously true with none)
    fn all_sessions_full(&self) -> bool {
        lock(&self.sessions).iter().all(|s| s.is_max_players())
    }

    fn first_open_session(&self) -> Option<Arc<Session>> {
        lock(&self.sessions)
            .iter()
            .find(|s| !s.is_max_players())
            .cloned()
    }

    /// Blocking accept. Clears the running flag on failure; `None` if stopped meanwhile.
    fn accept(&self) -> Result<Option<(TcpStream, SocketAddr)>, ServerError> {
        let listener = lock(&self.listener).clone().ok_or(ServerError::NotRunning)?;
        match listener.accept() {
            Ok(accepted) if self.is_running() => Ok(Some(accepted)),
            Ok(_) => Ok(None),
            Err(_) if !self.is_running() => Ok(None),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(ServerError::Stream(e))
            }
        }
    }

    fn session_emptied(&self, id: usize) {
        debug!("Session {} closed", id);
        if !self.is_running() {
            self.release_listener();
        }
    }

    fn release_listener(&self) {
        lock(&self.listener).take();
    }

    /// A blocked accept only returns on a connection, so make one.
    fn wake_acceptor(&self) {
        let Some(mut addr) = self.local_addr() else {
            return;
        };
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(e) = TcpStream::connect_timeout(&addr, Duration::from_millis(500)) {
            debug!("Acceptor wake-up failed: {}", e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::read_message;
    use std::io::Write;
    use std::thread;

    /// Formatted log output collected in memory
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with this thread's log output captured
    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        (out, logs)
    }

    fn local_manager(max_sessions: usize) -> (Arc<SessionManager>, SocketAddr) {
        let manager = SessionManager::new("127.0.0.1:0".parse().unwrap(), max_sessions);
        let addr = manager.start().unwrap();
        (manager, addr)
    }

    fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    #[test]
    fn test_create_session_requires_running() {
        let manager = SessionManager::new("127.0.0.1:0".parse().unwrap(), 2);
        assert!(matches!(
            manager.create_session(),
            Err(ServerError::NotRunning)
        ));
    }

    #[test]
    fn test_create_session_stops_at_max() {
        let (manager, _) = local_manager(2);
        assert!(manager.create_session().unwrap());
        assert!(!manager.is_max_sessions());
        assert!(manager.create_session().unwrap());
        assert!(manager.is_max_sessions());
        assert!(!manager.create_session().unwrap());
        assert_eq!(manager.sessions().len(), 2);
        manager.stop_server();
    }

    #[test]
    fn test_capacity_checks_are_stable() {
        let (manager, _) = local_manager(1);
        assert!(manager.first_session_full());
        manager.create_session().unwrap();
        for _ in 0..3 {
            assert!(manager.is_max_sessions());
            assert!(!manager.is_sessions_full());
            assert!(!manager.first_session_full());
        }
        manager.stop_server();
    }

    #[test]
    fn test_connect_player_sends_assignment() {
        let (manager, addr) = local_manager(1);
        manager.create_session().unwrap();

        let mut c1 = connect(addr);
        let (session, slot) = manager.connect_player().unwrap().unwrap();
        assert_eq!(slot, Slot::One);
        assert!(read_message(&mut c1).unwrap().is_control(Sentinel::Player1));

        let mut c2 = connect(addr);
        let (_, slot) = manager.connect_player().unwrap().unwrap();
        assert_eq!(slot, Slot::Two);
        assert!(read_message(&mut c2).unwrap().is_control(Sentinel::Player2));

        assert!(session.is_max_players());
        assert!(manager.is_sessions_full());
        manager.stop_server();
    }

    #[test]
    fn test_stop_connecting_players_replies_server_full() {
        let (manager, addr) = local_manager(1);
        let mut c = connect(addr);
        assert!(manager.stop_connecting_players());
        assert!(read_message(&mut c).unwrap().is_control(Sentinel::ServerFull));
        manager.stop_server();
    }

    #[test]
    fn test_stop_server_kicks_everyone() {
        let (manager, addr) = local_manager(1);
        manager.create_session().unwrap();
        let mut c1 = connect(addr);
        manager.connect_player().unwrap();
        let mut c2 = connect(addr);
        manager.connect_player().unwrap();
        read_message(&mut c1).unwrap();
        read_message(&mut c2).unwrap();

        manager.stop_server();

        assert!(read_message(&mut c1).unwrap().is_control(Sentinel::Kicked));
        assert!(read_message(&mut c2).unwrap().is_control(Sentinel::Kicked));
        assert!(manager.sessions().is_empty());
        assert!(!manager.is_running());
    }

    #[test]
    fn test_stop_server_unblocks_run() {
        let (manager, _) = local_manager(2);
        let runner = {
            let manager = manager.clone();
            thread::spawn(move || manager.run())
        };
        thread::sleep(Duration::from_millis(50));
        manager.stop_server();
        assert!(runner.join().unwrap().is_ok());
    }

    #[test]
    fn test_capacity_is_logged() {
        let (manager, addr) = local_manager(1);
        let (_, logs) = capture_logs(|| {
            manager.create_session().unwrap();
            let _c1 = connect(addr);
            manager.connect_player().unwrap().unwrap();
            assert!(!manager.is_sessions_full());
            let _c2 = connect(addr);
            manager.connect_player().unwrap().unwrap();
        });
        assert!(logs.contains("Max sessions reached"));
        assert!(logs.contains("Max players reached"));
        manager.stop_server();
    }

    #[test]
    fn test_player_seated_in_stopped_session_is_kicked() {
        let (manager, addr) = local_manager(1);
        manager.create_session().unwrap();
        let session = manager.sessions()[0].clone();
        // stop_server got to this session before the seat landed
        session.disconnect_players();

        let mut c = connect(addr);
        assert!(manager.connect_player().unwrap().is_none());
        assert!(read_message(&mut c).unwrap().is_control(Sentinel::Player1));
        assert!(read_message(&mut c).unwrap().is_control(Sentinel::Kicked));
        assert!(session.is_empty());
        manager.stop_server();
    }

    #[test]
    fn test_failed_accept_is_logged() {
        let (manager, _) = local_manager(1);
        lock(&manager.listener)
            .as_ref()
            .unwrap()
            .set_nonblocking(true)
            .unwrap();

        let (result, logs) = capture_logs(|| manager.run());
        assert!(matches!(result, Err(ServerError::Stream(_))));
        assert!(!manager.is_running());
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("Acceptance loop stopped"));
        manager.stop_server();
    }
}
