// Client-side round state: board, both players and both bombs

use std::time::Instant;

use super::board::{Board, Pos, TerrainLayout};
use super::bomb::{Bomb, BombEvent};
use super::input::MoveCommand;
use super::player::Player;
use crate::config::GameConfig;
use crate::network::{Message, Slot};

#[derive(Debug, Clone)]
pub struct GameState {
    pub board: Board,
    pub local: Player,
    /// `None` while no opponent is in the round
    pub remote: Option<Player>,
    pub local_bomb: Bomb,
    pub remote_bomb: Bomb,
    frozen: bool,
    slot: Slot,
    layout: TerrainLayout,
    config: GameConfig,
}

/// An inbound gameplay message pointed off the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange(pub Message);

impl GameState {
    /// Fresh board with only the local player, as used while waiting for an opponent
    pub fn new(slot: Slot, config: &GameConfig, layout: TerrainLayout) -> Self {
        let mut board = Board::with_layout(&layout);
        let local = Player::spawn(&mut board, slot, config.player_lives);
        Self {
            board,
            local,
            remote: None,
            local_bomb: Bomb::new(config),
            remote_bomb: Bomb::new(config),
            frozen: false,
            slot,
            layout,
            config: config.clone(),
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Rebuild the board with the local player alone on it
    pub fn reset_waiting(&mut self) {
        *self = Self::new(self.slot, &self.config, self.layout.clone());
    }

    /// Rebuild the board with both players in their corners and full lives
    pub fn reset_round(&mut self) {
        self.reset_waiting();
        let remote = Player::spawn(&mut self.board, self.slot.other(), self.config.player_lives);
        self.remote = Some(remote);
    }

    pub fn local_lives(&self) -> u32 {
        self.local.lives()
    }

    pub fn remote_lives(&self) -> u32 {
        self.remote.as_ref().map_or(0, Player::lives)
    }

    pub fn apply_move(&mut self, command: MoveCommand, now: Instant) {
        match command {
            MoveCommand::Move(direction) => {
                self.local.step(&mut self.board, direction);
            }
            MoveCommand::PlaceBomb => {
                let pos = self.local.position();
                self.local_bomb.place(&mut self.board, pos, now);
            }
        }
    }

    /// Advance both bombs; redraw players once a blast has been cleared
    pub fn tick(&mut self, now: Instant) {
        let cleared = [
            self.local_bomb.tick(&mut self.board, now),
            self.remote_bomb.tick(&mut self.board, now),
        ]
        .contains(&Some(BombEvent::Cleared));
        if cleared && !self.frozen {
            self.local.draw(&mut self.board);
            if let Some(remote) = &self.remote {
                remote.draw(&mut self.board);
            }
        }
    }

    /// Check the local player against both blasts. Each detonation hits at most once.
    pub fn check_local_hit(&mut self) -> bool {
        let pos = self.local.position();
        for bomb in [&mut self.local_bomb, &mut self.remote_bomb] {
            if bomb.is_active() && bomb.is_player_hit(pos) && !bomb.has_hit_player() {
                bomb.set_hit_player(true);
                self.local.remove_life();
                return true;
            }
        }
        false
    }

    pub fn remote_hit(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.remove_life();
        }
    }

    /// This tick's position report; the bomb is only announced while its fuse burns
    pub fn outbound(&self) -> Message {
        let (x, y) = self.local.position();
        let bomb = self
            .local_bomb
            .is_placed()
            .then(|| self.local_bomb.position())
            .map(|(bx, by)| (bx as i32, by as i32));
        Message::gameplay((x as i32, y as i32), bomb)
    }

    /// Apply the opponent's reported position and, if newly armed, its bomb
    pub fn apply_remote(&mut self, message: &Message, now: Instant) -> Result<(), OutOfRange> {
        let (x, y) = message.position();
        let pos = Board::position(x, y).ok_or(OutOfRange(*message))?;
        let bomb = match message.bomb() {
            Some((bx, by)) => Some(Board::position(bx, by).ok_or(OutOfRange(*message))?),
            None => None,
        };

        match self.remote.as_mut() {
            Some(remote) => remote.set_position(&mut self.board, pos),
            None => {
                let remote =
                    Player::new(&mut self.board, self.slot.other(), pos, self.config.player_lives);
                self.remote = Some(remote);
            }
        }

        if let Some(bomb_pos) = bomb {
            self.place_remote_bomb(bomb_pos, now);
        }
        Ok(())
    }

    fn place_remote_bomb(&mut self, pos: Pos, now: Instant) {
        if !self.remote_bomb.is_active() && !self.remote_bomb.is_placed() {
            self.remote_bomb.place(&mut self.board, pos, now);
        }
    }

    /// Freeze or release blast clearing for the round-end screen
    pub fn set_game_over(&mut self, game_over: bool) {
        self.frozen = game_over;
        self.local_bomb.set_game_over(game_over);
        self.remote_bomb.set_game_over(game_over);
    }

    /// Take the opponent off the board
    pub fn clear_remote(&mut self) {
        if let Some(remote) = self.remote.take() {
            remote.clear(&mut self.board);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Cell, Direction};
    use std::time::Duration;

    fn config() -> GameConfig {
        GameConfig {
            bomb_fuse_ms: 100,
            blast_duration_ms: 100,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_waiting_state_has_no_remote() {
        let state = GameState::new(Slot::Two, &config(), TerrainLayout::classic());
        assert!(state.remote.is_none());
        assert_eq!(state.local.position(), (10, 10));
        assert_eq!(state.local_lives(), 2);
        assert_eq!(state.remote_lives(), 0);
    }

    #[test]
    fn test_reset_round_places_both_players() {
        let mut state = GameState::new(Slot::One, &config(), TerrainLayout::classic());
        state.apply_move(MoveCommand::Move(Direction::Right), Instant::now());
        state.reset_round();
        assert_eq!(state.local.position(), (0, 0));
        assert_eq!(state.remote.as_ref().map(Player::position), Some((10, 10)));
        assert_eq!(state.remote_lives(), 2);
    }

    #[test]
    fn test_outbound_reports_bomb_only_while_fused() {
        let mut state = GameState::new(Slot::One, &config(), TerrainLayout::classic());
        let t0 = Instant::now();
        assert_eq!(state.outbound(), Message::new([0, 0, -9, -9]));

        state.apply_move(MoveCommand::PlaceBomb, t0);
        state.apply_move(MoveCommand::Move(Direction::Down), t0);
        assert_eq!(state.outbound(), Message::new([1, 0, 0, 0]));

        state.tick(t0 + Duration::from_millis(100));
        assert_eq!(state.outbound().bomb(), None);
    }

    #[test]
    fn test_hit_counts_once_per_detonation() {
        let mut state = GameState::new(Slot::One, &config(), TerrainLayout::classic());
        let t0 = Instant::now();
        state.apply_move(MoveCommand::PlaceBomb, t0);
        assert!(!state.check_local_hit());

        state.tick(t0 + Duration::from_millis(100));
        assert!(state.check_local_hit());
        assert!(!state.check_local_hit());
        assert_eq!(state.local_lives(), 1);

        state.tick(t0 + Duration::from_millis(200));
        assert!(!state.check_local_hit());
        assert_eq!(state.board.get((0, 0)), state.local.sprite());

        state.apply_move(MoveCommand::PlaceBomb, t0 + Duration::from_millis(200));
        state.tick(t0 + Duration::from_millis(300));
        assert!(state.check_local_hit());
        assert_eq!(state.local_lives(), 0);
    }

    #[test]
    fn test_remote_bomb_hits_local_player() {
        let mut state = GameState::new(Slot::One, &config(), TerrainLayout::classic());
        state.reset_round();
        let t0 = Instant::now();

        state.apply_remote(&Message::new([1, 0, 0, 0]), t0).unwrap();
        assert!(state.remote_bomb.is_placed());
        assert_eq!(state.board.get((0, 0)), Cell::Bomb);

        // A repeated report of the same bomb does not re-arm it
        state.apply_remote(&Message::new([2, 0, 0, 0]), t0).unwrap();
        state.tick(t0 + Duration::from_millis(100));
        assert!(!state.remote_bomb.is_placed());
        state.apply_remote(&Message::new([2, 0, 0, 0]), t0).unwrap();
        assert!(!state.remote_bomb.is_placed());

        assert!(state.check_local_hit());
    }

    #[test]
    fn test_off_board_update_is_rejected() {
        let mut state = GameState::new(Slot::One, &config(), TerrainLayout::classic());
        state.reset_round();
        let bad = Message::new([11, 0, -9, -9]);
        assert_eq!(state.apply_remote(&bad, Instant::now()), Err(OutOfRange(bad)));
        let bad_bomb = Message::new([10, 10, 3, 40]);
        assert!(state.apply_remote(&bad_bomb, Instant::now()).is_err());
        assert_eq!(state.remote.as_ref().map(Player::position), Some((10, 10)));
    }

    #[test]
    fn test_remote_hit_and_clear() {
        let mut state = GameState::new(Slot::Two, &config(), TerrainLayout::classic());
        state.reset_round();
        state.remote_hit();
        assert_eq!(state.remote_lives(), 1);
        state.clear_remote();
        assert!(state.remote.is_none());
        assert_eq!(state.board.get((0, 0)), Cell::Empty);
    }
}
