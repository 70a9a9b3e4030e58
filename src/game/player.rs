// Player model: position, lives and the sprite drawn on the board

use super::board::{Board, Cell, Direction, Pos, Sprite, BOARD_SIZE};
use crate::network::Slot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    slot: Slot,
    pos: Pos,
    lives: u32,
    facing: Direction,
}

impl Player {
    /// Create a player at `pos` and draw it
    pub fn new(board: &mut Board, slot: Slot, pos: Pos, lives: u32) -> Self {
        let player = Self {
            slot,
            pos,
            lives,
            facing: Direction::Down,
        };
        player.draw(board);
        player
    }

    /// Create a player in its slot's starting corner
    pub fn spawn(board: &mut Board, slot: Slot, lives: u32) -> Self {
        Self::new(board, slot, start_position(slot), lives)
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn position(&self) -> Pos {
        self.pos
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn remove_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn sprite(&self) -> Cell {
        Cell::Player(Sprite {
            owner: self.slot,
            facing: self.facing,
        })
    }

    pub fn draw(&self, board: &mut Board) {
        board.set(self.pos, self.sprite());
    }

    /// Move one cell. Only empty or burning cells can be entered.
    pub fn step(&mut self, board: &mut Board, direction: Direction) -> bool {
        let Some(next) = Board::neighbour(self.pos, direction) else {
            return false;
        };
        if !board.get(next).is_walkable() {
            return false;
        }
        self.leave(board);
        self.pos = next;
        self.facing = direction;
        self.draw(board);
        true
    }

    /// Follow a position reported by the remote side.
    ///
    /// A single step animates like a local move; anything else jumps straight there,
    /// since the remote client owns its own position.
    pub fn set_position(&mut self, board: &mut Board, pos: Pos) {
        if pos == self.pos {
            return;
        }
        if let Some(direction) = Direction::between(self.pos, pos) {
            if self.step(board, direction) {
                return;
            }
            self.facing = direction;
        }
        self.leave(board);
        self.pos = pos;
        self.draw(board);
    }

    /// Remove the sprite from the board, leaving bombs and blasts alone
    pub fn clear(&self, board: &mut Board) {
        self.leave(board);
    }

    fn leave(&self, board: &mut Board) {
        match board.get(self.pos) {
            Cell::Bomb | Cell::Explosion(_) => {}
            _ => board.set(self.pos, Cell::Empty),
        }
    }
}

/// Player one starts top left, player two bottom right
pub fn start_position(slot: Slot) -> Pos {
    match slot {
        Slot::One => (0, 0),
        Slot::Two => (BOARD_SIZE - 1, BOARD_SIZE - 1),
    }
}
