// Board model: an 11x11 grid of cells with symbolic content
// Coordinates are (x, y) with x the row (up is x - 1) and y the column (left is y - 1)

use crate::network::Slot;

pub const BOARD_SIZE: usize = 11;

pub type Pos = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Direction of a single-cell step from `from` to `to`, if it is one
    pub fn between(from: Pos, to: Pos) -> Option<Direction> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| Board::neighbour(from, *d) == Some(to))
    }
}

/// Which way a player sprite faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sprite {
    pub owner: Slot,
    pub facing: Direction,
}

/// Part of an explosion: the centre, or an arm `distance` cells out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blast {
    Centre,
    Arm(Direction, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Destructible block
    Terrain,
    /// Pillar: impassable and stops blasts
    PermTerrain,
    Bomb,
    Explosion(Blast),
    Player(Sprite),
    AnimationBlock,
}

impl Cell {
    pub fn is_explosion(self) -> bool {
        matches!(self, Cell::Explosion(_))
    }

    /// Cells a player may step into
    pub fn is_walkable(self) -> bool {
        matches!(self, Cell::Empty | Cell::Explosion(_))
    }
}

/// Static terrain placed on a fresh board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainLayout {
    pub permanent: Vec<Pos>,
    pub destructible: Vec<Pos>,
}

impl TerrainLayout {
    pub fn empty() -> Self {
        Self {
            permanent: Vec::new(),
            destructible: Vec::new(),
        }
    }

    /// Pillars on every odd/odd cell plus the standard block set
    pub fn classic() -> Self {
        let permanent = (1..BOARD_SIZE)
            .step_by(2)
            .flat_map(|x| (1..BOARD_SIZE).step_by(2).map(move |y| (x, y)))
            .collect();
        Self {
            permanent,
            destructible: CLASSIC_BLOCKS.to_vec(),
        }
    }
}

impl Default for TerrainLayout {
    fn default() -> Self {
        Self::classic()
    }
}

#[rustfmt::skip]
const CLASSIC_BLOCKS: [Pos; 52] = [
    (0, 2), (0, 3), (0, 4), (0, 5), (0, 7),
    (1, 2), (1, 4),
    (2, 3), (2, 4), (2, 5), (2, 6), (2, 7), (2, 8),
    (3, 0), (3, 2), (3, 4), (3, 8), (3, 10),
    (4, 2), (4, 4), (4, 5), (4, 6), (4, 7), (4, 8),
    (5, 0), (5, 2), (5, 8), (5, 10),
    (6, 2), (6, 3), (6, 5), (6, 8), (6, 9), (6, 10),
    (7, 0), (7, 2), (7, 4), (7, 6), (7, 8), (7, 10),
    (8, 2), (8, 3), (8, 4), (8, 5), (8, 6), (8, 7),
    (9, 6), (9, 10),
    (10, 3), (10, 5), (10, 6), (10, 7),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn with_layout(layout: &TerrainLayout) -> Self {
        let mut board = Self::empty();
        for &pos in &layout.destructible {
            board.set(pos, Cell::Terrain);
        }
        for &pos in &layout.permanent {
            board.set(pos, Cell::PermTerrain);
        }
        board
    }

    pub fn size(&self) -> usize {
        BOARD_SIZE
    }

    /// Out-of-range reads are treated as pillars
    pub fn get(&self, (x, y): Pos) -> Cell {
        self.cells
            .get(x)
            .and_then(|row| row.get(y))
            .copied()
            .unwrap_or(Cell::PermTerrain)
    }

    /// Out-of-range writes are ignored
    pub fn set(&mut self, (x, y): Pos, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(x).and_then(|row| row.get_mut(y)) {
            *slot = cell;
        }
    }

    pub fn is_perm_terrain(&self, pos: Pos) -> bool {
        self.get(pos) == Cell::PermTerrain
    }

    /// Convert wire coordinates to a position, if they lie on the board
    pub fn position(x: i32, y: i32) -> Option<Pos> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < BOARD_SIZE && y < BOARD_SIZE).then_some((x, y))
    }

    pub fn neighbour((x, y): Pos, direction: Direction) -> Option<Pos> {
        let (dx, dy) = direction.delta();
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < BOARD_SIZE && ny < BOARD_SIZE).then_some((nx, ny))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell; BOARD_SIZE]> {
        self.cells.iter()
    }

    /// Spiral fill order for the round-end animation.
    ///
    /// Right column top to bottom, bottom row right to left, left column bottom to top,
    /// top row left to right, then the same one ring further in.
    pub fn spiral_order() -> Vec<Pos> {
        let mut order = Vec::with_capacity(BOARD_SIZE * BOARD_SIZE);
        let (mut top, mut left) = (0usize, 0usize);
        let (mut bottom, mut right) = (BOARD_SIZE - 1, BOARD_SIZE - 1);
        loop {
            for x in top..=bottom {
                order.push((x, right));
            }
            if left == right {
                break;
            }
            for y in (left..right).rev() {
                order.push((bottom, y));
            }
            if top == bottom {
                break;
            }
            for x in (top..bottom).rev() {
                order.push((x, left));
            }
            for y in left + 1..right {
                order.push((top, y));
            }
            top += 1;
            left += 1;
            bottom -= 1;
            right -= 1;
            if top > bottom || left > right {
                break;
            }
        }
        order
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::with_layout(&TerrainLayout::classic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_classic_layout() {
        let board = Board::default();
        assert_eq!(board.get((1, 1)), Cell::PermTerrain);
        assert_eq!(board.get((9, 9)), Cell::PermTerrain);
        assert_eq!(board.get((0, 2)), Cell::Terrain);
        assert_eq!(board.get((10, 7)), Cell::Terrain);

        // Both corners start with room to move
        for pos in [(0, 0), (0, 1), (1, 0), (10, 10), (10, 9), (10, 8)] {
            assert_eq!(board.get(pos), Cell::Empty, "{:?}", pos);
        }

        let pillars = board
            .rows()
            .flatten()
            .filter(|&&c| c == Cell::PermTerrain)
            .count();
        assert_eq!(pillars, 25);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut board = Board::empty();
        assert_eq!(board.get((11, 0)), Cell::PermTerrain);
        board.set((0, 11), Cell::Bomb);
        assert_eq!(board, Board::empty());
    }

    #[test]
    fn test_wire_positions() {
        assert_eq!(Board::position(0, 10), Some((0, 10)));
        assert_eq!(Board::position(-9, 0), None);
        assert_eq!(Board::position(11, 0), None);
    }

    #[test]
    fn test_neighbours_stop_at_edges() {
        assert_eq!(Board::neighbour((0, 0), Direction::Up), None);
        assert_eq!(Board::neighbour((0, 0), Direction::Down), Some((1, 0)));
        assert_eq!(Board::neighbour((10, 10), Direction::Right), None);
        assert_eq!(Board::neighbour((5, 5), Direction::Left), Some((5, 4)));
        assert_eq!(Direction::between((5, 5), (4, 5)), Some(Direction::Up));
        assert_eq!(Direction::between((5, 5), (3, 5)), None);
    }

    #[test]
    fn test_spiral_covers_every_cell_once() {
        let order = Board::spiral_order();
        assert_eq!(order.len(), BOARD_SIZE * BOARD_SIZE);
        let unique: HashSet<Pos> = order.iter().copied().collect();
        assert_eq!(unique.len(), order.len());

        assert_eq!(order[0], (0, 10));
        assert_eq!(order[10], (10, 10));
        assert_eq!(order[11], (10, 9));
        assert_eq!(order[20], (10, 0));
        assert_eq!(order[21], (9, 0));
        assert_eq!(*order.last().unwrap(), (5, 5));
    }
}
