// Bomb lifecycle: placed -> exploding -> idle, advanced by the engine tick

use std::time::{Duration, Instant};

use super::board::{Blast, Board, Cell, Direction, Pos};
use crate::config::GameConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Fused { explodes_at: Instant },
    Exploding { clears_at: Instant },
}

/// What a call to [`Bomb::tick`] changed on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BombEvent {
    Exploded,
    Cleared,
}

#[derive(Debug, Clone)]
pub struct Bomb {
    pos: Pos,
    phase: Phase,
    blast: Vec<Pos>,
    hit_player: bool,
    game_over: bool,
    fuse: Duration,
    blast_duration: Duration,
    radius: usize,
}

impl Bomb {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            pos: (0, 0),
            phase: Phase::Idle,
            blast: Vec::new(),
            hit_player: false,
            game_over: false,
            fuse: config.bomb_fuse(),
            blast_duration: config.blast_duration(),
            radius: config.blast_radius,
        }
    }

    pub fn position(&self) -> Pos {
        self.pos
    }

    /// Placed or exploding
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Fuse is burning
    pub fn is_placed(&self) -> bool {
        matches!(self.phase, Phase::Fused { .. })
    }

    /// Drop the bomb at `pos`. Does nothing while a previous bomb is still active.
    pub fn place(&mut self, board: &mut Board, pos: Pos, now: Instant) -> bool {
        if self.is_active() {
            return false;
        }
        self.pos = pos;
        self.phase = Phase::Fused {
            explodes_at: now + self.fuse,
        };
        board.set(pos, Cell::Bomb);
        true
    }

    /// Advance the timers. A late tick may both explode and clear.
    pub fn tick(&mut self, board: &mut Board, now: Instant) -> Option<BombEvent> {
        let mut event = None;
        if let Phase::Fused { explodes_at } = self.phase {
            if now < explodes_at {
                return None;
            }
            self.explode(board);
            self.phase = Phase::Exploding {
                clears_at: explodes_at + self.blast_duration,
            };
            event = Some(BombEvent::Exploded);
        }
        if let Phase::Exploding { clears_at } = self.phase {
            if now >= clears_at {
                self.clear(board);
                event = Some(BombEvent::Cleared);
            }
        }
        event
    }

    /// Cells covered by the current blast, empty unless exploding
    pub fn blast_cells(&self) -> &[Pos] {
        &self.blast
    }

    pub fn is_player_hit(&self, pos: Pos) -> bool {
        self.blast.contains(&pos)
    }

    pub fn has_hit_player(&self) -> bool {
        self.hit_player
    }

    pub fn set_hit_player(&mut self, hit: bool) {
        self.hit_player = hit;
    }

    /// While set, clearing a blast leaves its cells on the board
    pub fn set_game_over(&mut self, game_over: bool) {
        self.game_over = game_over;
    }

    fn explode(&mut self, board: &mut Board) {
        self.blast.clear();
        board.set(self.pos, Cell::Explosion(Blast::Centre));
        self.blast.push(self.pos);

        for direction in Direction::ALL {
            let mut pos = self.pos;
            for distance in 1..=self.radius {
                match Board::neighbour(pos, direction) {
                    Some(next) if !board.is_perm_terrain(next) => {
                        board.set(next, Cell::Explosion(Blast::Arm(direction, distance)));
                        self.blast.push(next);
                        pos = next;
                    }
                    _ => break,
                }
            }
        }
    }

    fn clear(&mut self, board: &mut Board) {
        if !self.game_over {
            for &pos in &self.blast {
                board.set(pos, Cell::Empty);
            }
        }
        self.blast.clear();
        self.phase = Phase::Idle;
        self.hit_player = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::TerrainLayout;

    fn config() -> GameConfig {
        GameConfig {
            bomb_fuse_ms: 100,
            blast_duration_ms: 50,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_timeline() {
        let mut board = Board::with_layout(&TerrainLayout::empty());
        let mut bomb = Bomb::new(&config());
        let t0 = Instant::now();

        assert!(bomb.place(&mut board, (5, 5), t0));
        assert!(bomb.is_active() && bomb.is_placed());
        assert_eq!(board.get((5, 5)), Cell::Bomb);
        assert!(!bomb.place(&mut board, (6, 5), t0));

        assert_eq!(bomb.tick(&mut board, t0 + Duration::from_millis(99)), None);
        assert_eq!(
            bomb.tick(&mut board, t0 + Duration::from_millis(100)),
            Some(BombEvent::Exploded)
        );
        assert!(bomb.is_active() && !bomb.is_placed());
        assert!(board.get((5, 5)).is_explosion());

        assert_eq!(
            bomb.tick(&mut board, t0 + Duration::from_millis(150)),
            Some(BombEvent::Cleared)
        );
        assert!(!bomb.is_active());
        assert_eq!(board.get((5, 5)), Cell::Empty);
        assert!(bomb.blast_cells().is_empty());
    }

    #[test]
    fn test_blast_shape_open_field() {
        let mut board = Board::with_layout(&TerrainLayout::empty());
        let mut bomb = Bomb::new(&config());
        let t0 = Instant::now();
        bomb.place(&mut board, (5, 5), t0);
        bomb.tick(&mut board, t0 + Duration::from_millis(100));

        assert_eq!(bomb.blast_cells().len(), 9);
        for pos in [(3, 5), (4, 5), (6, 5), (7, 5), (5, 3), (5, 4), (5, 6), (5, 7)] {
            assert!(bomb.is_player_hit(pos), "{:?}", pos);
        }
        assert!(!bomb.is_player_hit((8, 5)));
        assert!(!bomb.is_player_hit((4, 4)));
        assert_eq!(
            board.get((3, 5)),
            Cell::Explosion(Blast::Arm(Direction::Up, 2))
        );
    }

    #[test]
    fn test_blast_stops_at_pillars_and_edges() {
        let mut board = Board::default();
        let mut bomb = Bomb::new(&config());
        let t0 = Instant::now();
        bomb.place(&mut board, (0, 0), t0);
        bomb.tick(&mut board, t0 + Duration::from_millis(100));

        // Up and left are off the board; down and right are open for two cells
        let mut cells = bomb.blast_cells().to_vec();
        cells.sort();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)]);
        // The block at (0, 2) was destroyed by the blast
        assert!(board.get((0, 2)).is_explosion());

        let mut bomb = Bomb::new(&config());
        let mut board = Board::default();
        bomb.place(&mut board, (2, 1), t0);
        bomb.tick(&mut board, t0 + Duration::from_millis(100));
        // Pillars at (1, 1) and (3, 1) stop the vertical arms
        assert!(!bomb.is_player_hit((1, 1)));
        assert!(!bomb.is_player_hit((3, 1)));
        assert!(!board.is_perm_terrain((2, 1)));
    }

    #[test]
    fn test_game_over_keeps_blast_on_board() {
        let mut board = Board::with_layout(&TerrainLayout::empty());
        let mut bomb = Bomb::new(&config());
        let t0 = Instant::now();
        bomb.place(&mut board, (5, 5), t0);
        bomb.set_game_over(true);
        bomb.set_hit_player(true);
        bomb.tick(&mut board, t0 + Duration::from_millis(500));

        assert!(!bomb.is_active());
        assert!(!bomb.has_hit_player());
        assert!(board.get((5, 5)).is_explosion());
    }
}
