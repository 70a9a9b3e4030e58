// What the terminal shows, rebuilt from engine events on the UI thread

use std::time::{Duration, Instant};

use crate::client::{Notice, UiEvent};
use crate::game::Board;
use crate::network::Slot;

use super::overlay::OverlayMessage;

const NOTICE_TTL: Duration = Duration::from_secs(2);
const BANNER_TTL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connecting,
    Waiting,
    Playing,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub board: Board,
    pub local_lives: u32,
    pub remote_lives: u32,
    pub status: Status,
    pub overlay: Option<OverlayMessage>,
    pub slot: Option<Slot>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            board: Board::empty(),
            local_lives: 0,
            remote_lives: 0,
            status: Status::Connecting,
            overlay: None,
            slot: None,
        }
    }
}

impl ViewState {
    pub fn apply(&mut self, event: UiEvent, now: Instant) {
        match event {
            UiEvent::Board(board) => self.board = *board,
            UiEvent::Lives { local, remote } => {
                self.local_lives = local;
                self.remote_lives = remote;
            }
            UiEvent::Waiting => self.status = Status::Waiting,
            UiEvent::RoundStarted => {
                self.status = Status::Playing;
                self.overlay = None;
            }
            UiEvent::Notice(notice) => self.show_notice(&notice, now),
            UiEvent::RoundEnded(outcome) => {
                self.overlay = Some(OverlayMessage::from(outcome).lasting(BANNER_TTL, now));
            }
            UiEvent::Reset => {
                self.board = Board::empty();
                self.local_lives = 0;
                self.remote_lives = 0;
                self.status = Status::Disconnected;
            }
        }
    }

    fn show_notice(&mut self, notice: &Notice, now: Instant) {
        let overlay = OverlayMessage::from(notice);
        self.overlay = Some(match notice {
            Notice::Connected(slot) => {
                self.slot = Some(*slot);
                overlay.lasting(NOTICE_TTL, now)
            }
            Notice::OtherPlayerQuit => overlay.lasting(NOTICE_TTL, now),
            // Stays up until the user reconnects or leaves
            Notice::ServerShutDown | Notice::ConnectionLost => {
                overlay.with_line("").with_line("R: reconnect   Q: quit")
            }
        });
    }

    /// Show a message that stays until replaced
    pub fn show(&mut self, overlay: OverlayMessage) {
        self.overlay = Some(overlay);
    }

    pub fn expire_overlay(&mut self, now: Instant) {
        if self.overlay.as_ref().is_some_and(|o| o.is_expired(now)) {
            self.overlay = None;
        }
    }

    pub fn status_lines(&self) -> [String; 2] {
        match self.status {
            Status::Connecting => ["Connecting...".to_string(), String::new()],
            Status::Waiting => [
                "Waiting for other player...".to_string(),
                "Why not practice blowing up some blocks!".to_string(),
            ],
            Status::Playing => [
                format!(
                    "Lives  You: {}   Opponent: {}",
                    self.local_lives, self.remote_lives
                ),
                match self.slot {
                    Some(slot) => format!("Playing as player {}", slot),
                    None => String::new(),
                },
            ],
            Status::Disconnected => ["Disconnected".to_string(), String::new()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Outcome;

    #[test]
    fn test_round_lifecycle() {
        let now = Instant::now();
        let mut view = ViewState::default();
        view.apply(UiEvent::Notice(Notice::Connected(Slot::One)), now);
        view.apply(UiEvent::Waiting, now);
        assert_eq!(view.slot, Some(Slot::One));
        assert_eq!(view.status_lines()[0], "Waiting for other player...");

        view.apply(UiEvent::RoundStarted, now);
        view.apply(UiEvent::Lives { local: 2, remote: 1 }, now);
        assert!(view.overlay.is_none());
        assert_eq!(view.status_lines()[0], "Lives  You: 2   Opponent: 1");

        view.apply(UiEvent::RoundEnded(Outcome::Won), now);
        assert_eq!(view.overlay.as_ref().map(|o| o.lines[0].as_str()), Some("You Won!"));
        view.expire_overlay(now + BANNER_TTL);
        assert!(view.overlay.is_none());
    }

    #[test]
    fn test_disconnect_notice_persists() {
        let now = Instant::now();
        let mut view = ViewState::default();
        view.apply(UiEvent::Reset, now);
        view.apply(UiEvent::Notice(Notice::ServerShutDown), now);
        view.expire_overlay(now + Duration::from_secs(600));
        assert_eq!(view.status, Status::Disconnected);
        let overlay = view.overlay.expect("overlay");
        assert_eq!(overlay.lines[0], "Disconnected: server shut down");
    }
}
