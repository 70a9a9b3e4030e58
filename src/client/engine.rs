// Client synchronization engine
//
// Runs on its own thread and owns the read half of the server connection. Each
// exchange is half-duplex: send one message, then block for exactly one reply.
//
//   WaitingForPeer -> Playing -> RoundEnding -> WaitingForPeer ...
//          \____________\____________\______> Disconnected
//
// While waiting, the local player can still move and set off bombs. Moves reach the
// engine through a channel and are applied between exchanges.

use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::connection::{send_on, ServerConnection, SharedWriter};
use super::presenter::{Notice, Outcome, Presenter};
use crate::config::{Config, GameConfig};
use crate::game::board::{Board, Cell, TerrainLayout};
use crate::game::state::OutOfRange;
use crate::game::{GameState, MoveCommand};
use crate::network::error::is_transient;
use crate::network::{EngineError, Message, Sentinel};
use crate::timing::limit_frame_rate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The user asked to leave
    LocalQuit,
    /// The server sent KICKED
    ServerShutDown,
    /// The stream ended or failed
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    WaitingForPeer,
    Playing,
    RoundEnding(Outcome),
    Disconnected(DisconnectReason),
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    pub wait_interval: Duration,
    pub game: GameConfig,
    pub layout: TerrainLayout,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: config.client.tick_interval(),
            wait_interval: config.client.wait_interval(),
            game: config.game.clone(),
            layout: TerrainLayout::classic(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Control side of a running engine, held by the UI thread
pub struct EngineHandle {
    moves: Sender<MoveCommand>,
    quit: Arc<AtomicBool>,
    writer: SharedWriter,
    stream: TcpStream,
    thread: Option<JoinHandle<DisconnectReason>>,
}

impl EngineHandle {
    /// Queue a move; false once the engine has stopped
    pub fn send_move(&self, command: MoveCommand) -> bool {
        self.moves.send(command).is_ok()
    }

    /// Leave the session: announce the quit and close the socket under the engine.
    pub fn disconnect(&self) {
        if self.quit.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = send_on(&self.writer, &Message::control(Sentinel::PlayerLeftSession)) {
            debug!("Could not announce quit: {}", e);
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the engine thread and return why it stopped
    pub fn join(mut self) -> DisconnectReason {
        self.thread
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or(DisconnectReason::ConnectionLost)
    }
}

/// Start the engine on its own thread
pub fn spawn_engine<P>(
    conn: ServerConnection,
    settings: EngineSettings,
    presenter: P,
) -> io::Result<EngineHandle>
where
    P: Presenter + 'static,
{
    let (tx, rx) = mpsc::channel();
    let quit = Arc::new(AtomicBool::new(false));
    let writer = conn.writer();
    let stream = conn.try_clone_stream()?;
    let engine = SyncEngine::new(conn, settings, presenter, rx, quit.clone());
    let thread = thread::Builder::new()
        .name("sync-engine".to_string())
        .spawn(move || engine.run())?;
    Ok(EngineHandle {
        moves: tx,
        quit,
        writer,
        stream,
        thread: Some(thread),
    })
}

pub struct SyncEngine<P: Presenter> {
    conn: ServerConnection,
    game: GameState,
    state: EngineState,
    presenter: P,
    moves: Receiver<MoveCommand>,
    quit: Arc<AtomicBool>,
    settings: EngineSettings,
}

impl<P: Presenter> SyncEngine<P> {
    pub fn new(
        conn: ServerConnection,
        settings: EngineSettings,
        presenter: P,
        moves: Receiver<MoveCommand>,
        quit: Arc<AtomicBool>,
    ) -> Self {
        let game = GameState::new(conn.slot(), &settings.game, settings.layout.clone());
        Self {
            conn,
            game,
            state: EngineState::WaitingForPeer,
            presenter,
            moves,
            quit,
            settings,
        }
    }

    /// Drive the state machine until the connection is gone
    pub fn run(mut self) -> DisconnectReason {
        self.presenter.notice(Notice::Connected(self.conn.slot()));
        self.enter_waiting();

        loop {
            if self.quitting() {
                self.state = EngineState::Disconnected(DisconnectReason::LocalQuit);
            }
            let state = self.state;
            let step = match state {
                EngineState::WaitingForPeer => self.wait_for_other_player(),
                EngineState::Playing => self.play_tick(),
                EngineState::RoundEnding(outcome) => self.end_round(outcome),
                EngineState::Disconnected(reason) => return self.finish(reason),
            };
            if let Err(e) = step {
                self.handle_error(e);
            }
        }
    }

    /// Two-phase ready handshake. Only a READY reply moves on; NOTREADY means we are
    /// alone, anything else is a stale message from the previous round.
    fn wait_for_other_player(&mut self) -> Result<(), EngineError> {
        self.update_local();
        self.presenter.board_changed(&self.game.board);

        self.send(&Message::control(Sentinel::OtherPlayerReady))?;
        let reply = self.receive()?;
        if self.quitting() {
            return Ok(());
        }

        match reply.sentinel() {
            Some(Sentinel::OtherPlayerReady) => {
                self.send(&Message::control(Sentinel::OtherPlayerReady))?;
                self.receive()?;
                self.start_round();
            }
            Some(Sentinel::OtherPlayerNotReady) => self.practice_for(self.settings.wait_interval),
            _ => debug!("Discarding {} while waiting", reply),
        }
        Ok(())
    }

    fn play_tick(&mut self) -> Result<(), EngineError> {
        let tick_start = Instant::now();
        self.update_local();

        if self.game.check_local_hit() {
            self.report_lives();
            if self.game.local_lives() == 0 {
                self.state = EngineState::RoundEnding(Outcome::Lost);
                return Ok(());
            }
            self.send(&Message::control(Sentinel::PlayerHit))?;
        } else {
            let update = self.game.outbound();
            self.send(&update)?;
        }

        let reply = self.receive()?;
        match reply.sentinel() {
            Some(Sentinel::PlayerWon) => {
                let outcome = if self.game.remote_lives() == 0 {
                    Outcome::Draw
                } else {
                    Outcome::Won
                };
                self.state = EngineState::RoundEnding(outcome);
                return Ok(());
            }
            Some(Sentinel::PlayerHit) => {
                self.game.remote_hit();
                self.report_lives();
            }
            _ if reply.first() >= 0 => {
                if let Err(OutOfRange(bad)) = self.game.apply_remote(&reply, Instant::now()) {
                    warn!("Ignoring off-board update {}", bad);
                }
            }
            _ => {}
        }

        self.presenter.board_changed(&self.game.board);
        limit_frame_rate(tick_start, self.settings.tick_interval);
        Ok(())
    }

    fn end_round(&mut self, outcome: Outcome) -> Result<(), EngineError> {
        info!("Round over: {}", outcome.banner());
        self.state = EngineState::WaitingForPeer;
        self.game.set_game_over(true);
        self.presenter.round_ended(outcome);
        self.send(&Message::control(Sentinel::PlayerWon))?;
        self.run_ending_animation();
        self.enter_waiting();
        Ok(())
    }

    fn start_round(&mut self) {
        info!("Round started as player {}", self.game.slot());
        self.game.reset_round();
        self.state = EngineState::Playing;
        // Moves typed during the handshake belong to the practice board
        while self.moves.try_recv().is_ok() {}
        self.presenter.round_started();
        self.report_lives();
        self.presenter.board_changed(&self.game.board);
    }

    fn enter_waiting(&mut self) {
        self.game.reset_waiting();
        self.state = EngineState::WaitingForPeer;
        self.presenter.waiting_for_peer();
        self.presenter.board_changed(&self.game.board);
    }

    fn run_ending_animation(&mut self) {
        let step = self.settings.game.animation_step();
        for pos in Board::spiral_order() {
            if self.quitting() {
                return;
            }
            self.game.board.set(pos, Cell::AnimationBlock);
            self.presenter.board_changed(&self.game.board);
            if !step.is_zero() {
                thread::sleep(step);
            }
        }
    }

    /// Keep the practice board alive for `duration` before the next ready attempt
    fn practice_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let step = self.settings.tick_interval.max(Duration::from_millis(1));
        while !self.quitting() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.update_local();
            self.presenter.board_changed(&self.game.board);
            thread::sleep(step.min(deadline - now));
        }
    }

    fn handle_error(&mut self, e: EngineError) {
        match e {
            EngineError::PeerQuit => {
                info!("Other player quit");
                self.game.clear_remote();
                self.presenter.notice(Notice::OtherPlayerQuit);
                self.enter_waiting();
            }
            EngineError::ServerShutDown => {
                info!("Server shut down");
                self.state = EngineState::Disconnected(DisconnectReason::ServerShutDown);
            }
            EngineError::Stream(ref io) if is_transient(io) && !self.quitting() => {
                debug!("Retrying after transient error: {}", io);
            }
            EngineError::EndOfStream | EngineError::Stream(_) => {
                let reason = if self.quitting() {
                    DisconnectReason::LocalQuit
                } else {
                    warn!("Connection lost: {}", e);
                    DisconnectReason::ConnectionLost
                };
                self.state = EngineState::Disconnected(reason);
            }
        }
    }

    fn finish(mut self, reason: DisconnectReason) -> DisconnectReason {
        info!("Disconnected: {:?}", reason);
        self.presenter.reset_display();
        match reason {
            DisconnectReason::ServerShutDown => self.presenter.notice(Notice::ServerShutDown),
            DisconnectReason::ConnectionLost => self.presenter.notice(Notice::ConnectionLost),
            DisconnectReason::LocalQuit => {}
        }
        self.conn.shutdown();
        reason
    }

    fn update_local(&mut self) {
        let now = Instant::now();
        while let Ok(command) = self.moves.try_recv() {
            self.game.apply_move(command, now);
        }
        self.game.tick(now);
    }

    fn report_lives(&mut self) {
        self.presenter
            .lives_changed(self.game.local_lives(), self.game.remote_lives());
    }

    fn send(&self, message: &Message) -> Result<(), EngineError> {
        self.conn.send(message).map_err(EngineError::Stream)
    }

    /// Read one reply, turning quit and kick signals into errors
    fn receive(&mut self) -> Result<Message, EngineError> {
        let message = self.conn.read()?;
        match message.sentinel() {
            Some(Sentinel::PlayerLeftSession) => Err(EngineError::PeerQuit),
            Some(Sentinel::Kicked) => Err(EngineError::ServerShutDown),
            _ => Ok(message),
        }
    }

    fn quitting(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}
