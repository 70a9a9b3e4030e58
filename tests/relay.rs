// End-to-end relay behaviour against a real server on a loopback port

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bomberduel::network::protocol::{read_message, write_message};
use bomberduel::network::{Message, Sentinel, ServerError, Slot};
use bomberduel::server::SessionManager;

const NO_BOMB: i32 = -9;

struct TestServer {
    manager: Arc<SessionManager>,
    addr: SocketAddr,
    acceptor: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    fn start(max_sessions: usize) -> Self {
        let manager = SessionManager::new("127.0.0.1:0".parse().unwrap(), max_sessions);
        let addr = manager.start().unwrap();
        let acceptor = {
            let manager = manager.clone();
            thread::spawn(move || manager.run())
        };
        Self {
            manager,
            addr,
            acceptor: Some(acceptor),
        }
    }

    /// Connect and read the slot assignment
    fn join(&self) -> (TcpStream, Message) {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let assignment = read_message(&mut stream).unwrap();
        (stream, assignment)
    }

    /// Connect two players and wait until both are seated in the first session
    fn pair(&self) -> (TcpStream, TcpStream) {
        let (a, _) = self.join();
        let (b, _) = self.join();
        wait_until(|| {
            self.manager
                .sessions()
                .first()
                .is_some_and(|s| s.is_max_players())
        });
        (a, b)
    }

    fn stop(&mut self) {
        self.manager.stop_server();
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.join().unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.acceptor.is_some() {
            self.stop();
        }
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

fn send(stream: &mut TcpStream, message: Message) {
    write_message(stream, &message).unwrap();
}

fn control(sentinel: Sentinel) -> Message {
    Message::control(sentinel)
}

#[test]
fn test_first_client_is_player_one() {
    let server = TestServer::start(2);
    let (_a, assignment) = server.join();
    assert_eq!(assignment, Message::new([-1; 4]));
    let (_b, assignment) = server.join();
    assert_eq!(assignment, control(Sentinel::Player2));
}

#[test]
fn test_lone_player_is_told_not_ready() {
    let server = TestServer::start(2);
    let (mut a, _) = server.join();
    wait_until(|| server.manager.sessions().first().is_some_and(|s| s.player_count() == 1));

    for _ in 0..3 {
        send(&mut a, control(Sentinel::OtherPlayerReady));
        assert_eq!(read_message(&mut a).unwrap(), Message::new([-10; 4]));
    }
}

#[test]
fn test_ready_handshake_is_forwarded_verbatim() {
    let server = TestServer::start(2);
    let (mut a, mut b) = server.pair();

    send(&mut a, control(Sentinel::OtherPlayerReady));
    assert_eq!(read_message(&mut b).unwrap(), control(Sentinel::OtherPlayerReady));
    send(&mut b, control(Sentinel::OtherPlayerReady));
    assert_eq!(read_message(&mut a).unwrap(), control(Sentinel::OtherPlayerReady));

    // Second phase
    send(&mut a, control(Sentinel::OtherPlayerReady));
    assert_eq!(read_message(&mut b).unwrap(), Message::new([-8; 4]));
}

#[test]
fn test_gameplay_message_is_relayed() {
    let server = TestServer::start(2);
    let (mut a, mut b) = server.pair();

    send(&mut a, Message::new([3, 4, NO_BOMB, NO_BOMB]));
    assert_eq!(read_message(&mut b).unwrap(), Message::new([3, 4, NO_BOMB, NO_BOMB]));

    send(&mut b, Message::new([10, 9, 10, 10]));
    assert_eq!(read_message(&mut a).unwrap(), Message::new([10, 9, 10, 10]));
}

#[test]
fn test_quit_is_forwarded_and_slot_freed() {
    let server = TestServer::start(2);
    let (mut a, mut b) = server.pair();

    send(&mut a, control(Sentinel::PlayerLeftSession));
    assert_eq!(read_message(&mut b).unwrap(), control(Sentinel::PlayerLeftSession));

    let session = server.manager.sessions()[0].clone();
    wait_until(|| !session.is_occupied(Slot::One));
    assert!(session.is_occupied(Slot::Two));

    // The remaining player is alone again
    send(&mut b, control(Sentinel::OtherPlayerReady));
    assert_eq!(read_message(&mut b).unwrap(), control(Sentinel::OtherPlayerNotReady));
}

#[test]
fn test_abrupt_disconnect_is_reported_as_quit() {
    let server = TestServer::start(2);
    let (a, mut b) = server.pair();
    drop(a);
    assert_eq!(read_message(&mut b).unwrap(), control(Sentinel::PlayerLeftSession));
}

#[test]
fn test_freed_slot_is_reused() {
    let server = TestServer::start(2);
    let (mut a, _b) = server.pair();
    send(&mut a, control(Sentinel::PlayerLeftSession));
    let session = server.manager.sessions()[0].clone();
    wait_until(|| !session.is_occupied(Slot::One));

    let (_c, assignment) = server.join();
    assert_eq!(assignment, control(Sentinel::Player1));
    wait_until(|| session.is_max_players());
}

#[test]
fn test_stop_server_kicks_everyone() {
    let mut server = TestServer::start(2);
    let (mut a, mut b) = server.pair();

    server.stop();
    assert_eq!(read_message(&mut a).unwrap(), control(Sentinel::Kicked));
    assert_eq!(read_message(&mut b).unwrap(), Message::new([-5; 4]));
    assert!(server.manager.sessions().is_empty());
    assert!(!server.manager.is_running());
}

#[test]
fn test_full_server_rejects_with_server_full() {
    let server = TestServer::start(1);
    let (_a, _b) = server.pair();
    wait_until(|| server.manager.is_sessions_full());

    let (_c, reply) = server.join();
    assert_eq!(reply, control(Sentinel::ServerFull));
    // Capacity checks do not change the state they report on
    assert!(server.manager.is_sessions_full());
    assert!(server.manager.is_max_sessions());
}

#[test]
fn test_second_session_opens_when_first_is_full() {
    let server = TestServer::start(2);
    let (_a, _b) = server.pair();
    let (mut c, assignment) = server.join();
    assert_eq!(assignment, control(Sentinel::Player1));
    wait_until(|| server.manager.sessions().len() == 2);

    // Alone in the new session
    send(&mut c, control(Sentinel::OtherPlayerReady));
    assert_eq!(read_message(&mut c).unwrap(), control(Sentinel::OtherPlayerNotReady));
}
