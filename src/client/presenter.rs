// Presentation seam between the sync engine and whatever draws the game

use std::fmt;
use std::sync::mpsc::Sender;

use crate::game::Board;
use crate::network::Slot;

/// How a round ended for this client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Draw,
}

impl Outcome {
    pub fn banner(self) -> &'static str {
        match self {
            Outcome::Won => "You Won!",
            Outcome::Lost => "You Lost",
            Outcome::Draw => "Draw!",
        }
    }
}

/// One-off messages for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected(Slot),
    OtherPlayerQuit,
    ServerShutDown,
    ConnectionLost,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connected(Slot::One) => write!(f, "Connection successful: Player One"),
            Notice::Connected(Slot::Two) => write!(f, "Connection successful: Player Two"),
            Notice::OtherPlayerQuit => write!(f, "Other player quit!"),
            Notice::ServerShutDown => write!(f, "Disconnected: server shut down"),
            Notice::ConnectionLost => write!(f, "Disconnected: connection lost"),
        }
    }
}

/// Receives state changes from the engine thread.
///
/// Everything except `board_changed` has an empty default so tests can implement
/// only what they observe.
pub trait Presenter: Send {
    fn board_changed(&mut self, board: &Board);

    fn lives_changed(&mut self, _local: u32, _remote: u32) {}

    /// No opponent yet; the board is open for practice
    fn waiting_for_peer(&mut self) {}

    fn round_started(&mut self) {}

    fn notice(&mut self, _notice: Notice) {}

    fn round_ended(&mut self, _outcome: Outcome) {}

    /// Connection is gone; clear the board and status
    fn reset_display(&mut self) {}
}

/// Presenter calls turned into values, for a UI running on another thread
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Board(Box<Board>),
    Lives { local: u32, remote: u32 },
    Waiting,
    RoundStarted,
    Notice(Notice),
    RoundEnded(Outcome),
    Reset,
}

/// Forwards every call over a channel. A closed receiver is ignored.
pub struct ChannelPresenter {
    tx: Sender<UiEvent>,
}

impl ChannelPresenter {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

impl Presenter for ChannelPresenter {
    fn board_changed(&mut self, board: &Board) {
        self.send(UiEvent::Board(Box::new(board.clone())));
    }

    fn lives_changed(&mut self, local: u32, remote: u32) {
        self.send(UiEvent::Lives { local, remote });
    }

    fn waiting_for_peer(&mut self) {
        self.send(UiEvent::Waiting);
    }

    fn round_started(&mut self) {
        self.send(UiEvent::RoundStarted);
    }

    fn notice(&mut self, notice: Notice) {
        self.send(UiEvent::Notice(notice));
    }

    fn round_ended(&mut self, outcome: Outcome) {
        self.send(UiEvent::RoundEnded(outcome));
    }

    fn reset_display(&mut self) {
        self.send(UiEvent::Reset);
    }
}
