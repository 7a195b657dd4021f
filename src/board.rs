//! Two-layer tafl board representation.
//!
//! The board is stored as two row-major layers of the same size:
//! - the attacker layer holds `0` (empty) or `1` (attacker)
//! - the defender layer holds `0` (empty), `1` (defender) or `2` (king)
//!
//! A cell is occupied in at most one layer. Keeping the layers apart (rather
//! than a single enum per cell) mirrors how capture rules are phrased: "the
//! moving side's layer" against "the other side's layer".

use std::fmt;

use crate::constants::{DIRECTIONS, EMPTY, KING, SOLDIER};
use crate::error::{Result, TaflError};

/// A cell on the board as `(row, col)`, row 0 at the top.
pub type Point = (usize, usize);

/// One of the two sides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    /// Moves first; wins by capturing the king.
    Attacker,
    /// Owns the king; wins by bringing it to any edge cell.
    Defender,
}

impl Player {
    /// The other side.
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Player::Attacker => Player::Defender,
            Player::Defender => Player::Attacker,
        }
    }

    /// Numeric turn value: 0 for the attacker, 1 for the defender.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Player::Attacker => 0,
            Player::Defender => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Attacker => write!(f, "Attacker"),
            Player::Defender => write!(f, "Defender"),
        }
    }
}

/// The content of an occupied cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Piece {
    Attacker,
    Defender,
    King,
}

impl Piece {
    /// The side this piece belongs to.
    #[inline]
    pub fn owner(self) -> Player {
        match self {
            Piece::Attacker => Player::Attacker,
            Piece::Defender | Piece::King => Player::Defender,
        }
    }

    fn symbol(self) -> char {
        match self {
            Piece::Attacker => 'A',
            Piece::Defender => 'D',
            Piece::King => 'K',
        }
    }
}

/// Square board with one occupancy layer per side.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    size: usize,
    attackers: Vec<u8>,
    defenders: Vec<u8>,
}

impl Grid {
    /// Create an empty board of the given side length.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            attackers: vec![EMPTY; size * size],
            defenders: vec![EMPTY; size * size],
        }
    }

    /// Build a board from raw layers, validating every layer invariant.
    pub fn from_layers(size: usize, attackers: &[u8], defenders: &[u8]) -> Result<Self> {
        if size < 3 || size % 2 == 0 {
            return Err(TaflError::InvalidLayout(format!(
                "board side must be odd and at least 3 (got {size})"
            )));
        }
        if attackers.len() != size * size || defenders.len() != size * size {
            return Err(TaflError::InvalidLayout(format!(
                "layers must hold {} cells",
                size * size
            )));
        }
        let grid = Self {
            size,
            attackers: attackers.to_vec(),
            defenders: defenders.to_vec(),
        };
        grid.check_invariants().map_err(TaflError::InvalidLayout)?;
        Ok(grid)
    }

    /// Side length of the board.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The central cell.
    #[inline]
    pub fn throne(&self) -> Point {
        (self.size / 2, self.size / 2)
    }

    #[inline]
    fn idx(&self, (row, col): Point) -> usize {
        row * self.size + col
    }

    /// The piece on a cell, if any.
    pub fn get(&self, p: Point) -> Option<Piece> {
        let i = self.idx(p);
        match (self.attackers[i], self.defenders[i]) {
            (SOLDIER, _) => Some(Piece::Attacker),
            (_, SOLDIER) => Some(Piece::Defender),
            (_, KING) => Some(Piece::King),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(&self, p: Point) -> bool {
        let i = self.idx(p);
        self.attackers[i] == EMPTY && self.defenders[i] == EMPTY
    }

    /// Raw value of `player`'s layer at `p` (0, 1, or 2 for the king).
    #[inline]
    pub fn layer(&self, player: Player, p: Point) -> u8 {
        let i = self.idx(p);
        match player {
            Player::Attacker => self.attackers[i],
            Player::Defender => self.defenders[i],
        }
    }

    /// Place a piece on a cell, or clear it with `None`.
    pub fn set(&mut self, p: Point, piece: Option<Piece>) {
        let i = self.idx(p);
        let (a, d) = match piece {
            None => (EMPTY, EMPTY),
            Some(Piece::Attacker) => (SOLDIER, EMPTY),
            Some(Piece::Defender) => (EMPTY, SOLDIER),
            Some(Piece::King) => (EMPTY, KING),
        };
        self.attackers[i] = a;
        self.defenders[i] = d;
    }

    /// Step `k` cells from `p` in direction `dir`, or `None` if that leaves the board.
    #[inline]
    pub fn step(&self, p: Point, dir: (isize, isize), k: isize) -> Option<Point> {
        let row = p.0 as isize + dir.0 * k;
        let col = p.1 as isize + dir.1 * k;
        let n = self.size as isize;
        if (0..n).contains(&row) && (0..n).contains(&col) {
            Some((row as usize, col as usize))
        } else {
            None
        }
    }

    /// The up to four orthogonal neighbours of a cell.
    pub fn neighbors(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        DIRECTIONS.iter().filter_map(move |&d| self.step(p, d, 1))
    }

    /// Whether the cell lies on the outermost row or column.
    #[inline]
    pub fn on_edge(&self, (row, col): Point) -> bool {
        row == 0 || col == 0 || row == self.size - 1 || col == self.size - 1
    }

    /// All cells in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        let n = self.size;
        (0..n).flat_map(move |row| (0..n).map(move |col| (row, col)))
    }

    /// Location of the king, or `None` once it has been captured.
    pub fn king_square(&self) -> Option<Point> {
        self.defenders
            .iter()
            .position(|&v| v == KING)
            .map(|i| (i / self.size, i % self.size))
    }

    /// Number of pieces `player` has on the board (the king included).
    pub fn count(&self, player: Player) -> usize {
        let layer = match player {
            Player::Attacker => &self.attackers,
            Player::Defender => &self.defenders,
        };
        layer.iter().filter(|&&v| v != EMPTY).count()
    }

    /// Occupancy of both layers, one byte per cell:
    /// `0` empty, `1` attacker, `2` defender, `3` king.
    pub fn occupancy(&self) -> impl Iterator<Item = u8> + '_ {
        self.attackers
            .iter()
            .zip(&self.defenders)
            .map(|(&a, &d)| match (a, d) {
                (SOLDIER, _) => 1,
                (_, SOLDIER) => 2,
                (_, KING) => 3,
                _ => 0,
            })
    }

    /// Verify the layer invariants, describing the first violation found.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut kings = 0;
        for (i, (&a, &d)) in self.attackers.iter().zip(&self.defenders).enumerate() {
            let p = (i / self.size, i % self.size);
            if a > SOLDIER {
                return Err(format!("attacker layer holds {a} at {p:?}"));
            }
            if d > KING {
                return Err(format!("defender layer holds {d} at {p:?}"));
            }
            if a != EMPTY && d != EMPTY {
                return Err(format!("cell {p:?} is occupied by both sides"));
            }
            if d == KING {
                kings += 1;
            }
        }
        if kings > 1 {
            return Err(format!("found {kings} kings"));
        }
        Ok(())
    }
}

/// Parse a text coordinate such as `e3` into a [`Point`].
///
/// Columns are letters from `a`; ranks count from 1 at the bottom row.
pub fn parse_point(s: &str, size: usize) -> Result<Point> {
    let invalid = || TaflError::InvalidCoordinate(s.to_string());
    let mut chars = s.chars();
    let col_char = chars.next().ok_or_else(invalid)?.to_ascii_lowercase();
    if !col_char.is_ascii_lowercase() {
        return Err(invalid());
    }
    let col = (col_char as u8 - b'a') as usize;
    let digits = chars.as_str();
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let rank: usize = digits.parse().map_err(|_| invalid())?;
    if col >= size || rank == 0 || rank > size {
        return Err(invalid());
    }
    Ok((size - rank, col))
}

/// Convert a [`Point`] to its text coordinate (e.g. `e3`).
pub fn str_point((row, col): Point, size: usize) -> String {
    let c = (b'a' + col as u8) as char;
    format!("{c}{}", size - row)
}

/// Parse an ASCII diagram into a [`Grid`].
///
/// Each non-blank line is one row, top first. `.` is empty, `A` an attacker,
/// `D` a defender and `K` the king; whitespace inside a row is ignored.
pub fn parse_grid(diagram: &str) -> Result<Grid> {
    let rows: Vec<Vec<char>> = diagram
        .lines()
        .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
        .filter(|r| !r.is_empty())
        .collect();

    let size = rows.len();
    let mut attackers = vec![EMPTY; size * size];
    let mut defenders = vec![EMPTY; size * size];

    for (row, cells) in rows.iter().enumerate() {
        if cells.len() != size {
            return Err(TaflError::InvalidLayout(format!(
                "row {row} has {} cells, expected {size}",
                cells.len()
            )));
        }
        for (col, &c) in cells.iter().enumerate() {
            let i = row * size + col;
            match c.to_ascii_uppercase() {
                '.' => {}
                'A' => attackers[i] = SOLDIER,
                'D' => defenders[i] = SOLDIER,
                'K' => defenders[i] = KING,
                other => {
                    return Err(TaflError::InvalidLayout(format!(
                        "unexpected '{other}' at row {row}, column {col}"
                    )));
                }
            }
        }
    }

    Grid::from_layers(size, &attackers, &defenders)
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.size {
            write!(f, " {}", (b'a' + col as u8) as char)?;
        }
        writeln!(f)?;
        for row in 0..self.size {
            write!(f, "{:>2} |", self.size - row)?;
            for col in 0..self.size {
                let ch = match self.get((row, col)) {
                    Some(piece) => piece.symbol(),
                    None if (row, col) == self.throne() => '+',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_roundtrip() {
        for row in 0..9 {
            for col in 0..9 {
                let s = str_point((row, col), 9);
                assert_eq!(parse_point(&s, 9), Ok((row, col)), "roundtrip for {s}");
            }
        }
    }

    #[test]
    fn test_parse_point_bottom_left() {
        assert_eq!(parse_point("a1", 5), Ok((4, 0)));
        assert_eq!(parse_point("E5", 5), Ok((0, 4)));
    }

    #[test]
    fn test_parse_point_rejects_out_of_range() {
        assert!(parse_point("f1", 5).is_err());
        assert!(parse_point("a6", 5).is_err());
        assert!(parse_point("a0", 5).is_err());
        assert!(parse_point("", 5).is_err());
        assert!(parse_point("3a", 5).is_err());
    }

    #[test]
    fn test_parse_point_rejects_signed_rank() {
        assert!(parse_point("a+3", 5).is_err());
        assert!(parse_point("a-3", 5).is_err());
        assert!(parse_point("a 3", 5).is_err());
        assert_eq!(parse_point("a3", 5), Ok((2, 0)));
    }

    #[test]
    fn test_set_and_get() {
        let mut grid = Grid::new(5);
        grid.set((1, 2), Some(Piece::King));
        assert_eq!(grid.get((1, 2)), Some(Piece::King));
        assert_eq!(grid.layer(Player::Defender, (1, 2)), KING);
        assert_eq!(grid.king_square(), Some((1, 2)));

        grid.set((1, 2), Some(Piece::Attacker));
        assert_eq!(grid.get((1, 2)), Some(Piece::Attacker));
        assert_eq!(grid.layer(Player::Defender, (1, 2)), EMPTY);
        assert_eq!(grid.king_square(), None);

        grid.set((1, 2), None);
        assert!(grid.is_empty((1, 2)));
    }

    #[test]
    fn test_step_stays_on_board() {
        let grid = Grid::new(5);
        assert_eq!(grid.step((0, 0), (-1, 0), 1), None);
        assert_eq!(grid.step((0, 0), (1, 0), 2), Some((2, 0)));
        assert_eq!(grid.step((4, 4), (0, 1), 1), None);
        assert_eq!(grid.neighbors((0, 0)).count(), 2);
        assert_eq!(grid.neighbors((2, 2)).count(), 4);
    }

    #[test]
    fn test_parse_grid() {
        let grid = parse_grid(
            "
            . A . A .
            A . D . A
            . D K D .
            A . D . A
            . A . A .
            ",
        )
        .unwrap();
        assert_eq!(grid.size(), 5);
        assert_eq!(grid.count(Player::Attacker), 8);
        assert_eq!(grid.count(Player::Defender), 5);
        assert_eq!(grid.king_square(), Some((2, 2)));
    }

    #[test]
    fn test_parse_grid_rejects_ragged_rows() {
        assert!(parse_grid("...\n..\n...").is_err());
        assert!(parse_grid("...\n.X.\n...").is_err());
        assert!(parse_grid("....\n....\n....\n....").is_err());
    }

    #[test]
    fn test_invariants_reject_two_kings() {
        let err = parse_grid("K..\n...\n..K").unwrap_err();
        assert!(matches!(err, TaflError::InvalidLayout(_)));
    }

    #[test]
    fn test_invariants_reject_shared_cell() {
        let attackers = [0, 0, 0, 0, 1, 0, 0, 0, 0];
        let defenders = [0, 0, 0, 0, 2, 0, 0, 0, 0];
        assert!(Grid::from_layers(3, &attackers, &defenders).is_err());
    }

    #[test]
    fn test_display_marks_empty_throne() {
        let grid = Grid::new(3);
        let text = grid.to_string();
        assert!(text.contains('+'));
        assert!(text.contains(" 3 |"));
    }
}
