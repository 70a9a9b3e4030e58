pub mod board;
pub mod bomb;
pub mod input;
pub mod player;
pub mod state;

pub use board::{Blast, Board, Cell, Direction, Pos, Sprite, TerrainLayout, BOARD_SIZE};
pub use bomb::Bomb;
pub use input::{poll_input, InputAction, KeyMap, MoveCommand};
pub use player::Player;
pub use state::GameState;
