//! Hnefatafl position representation and the rules engine.
//!
//! This module provides the core game logic, including:
//! - Fixed starting layouts for the supported variants
//! - Rook-like move generation with the throne restriction
//! - Custodial capture resolution, including the throne and king special cases
//! - Terminal detection (king captured or king on the edge)
//!
//! There is exactly one state transition. [`Position::apply_move`] validates
//! and mutates the authoritative game, while [`Position::after_move`] and
//! [`Position::simulate_step`] run the same transition on a copy so search
//! never touches the position it was handed.

use std::fmt;
use std::str::FromStr;

use crate::board::{Grid, Piece, Player, Point, parse_grid, parse_point, str_point};
use crate::constants::{
    COPENHAGEN_SIZE, DIRECTIONS, EMPTY, HISTORICAL_SIZE, KING, MINI_SIZE, SOLDIER,
};
use crate::error::{Result, TaflError};

const HISTORICAL_LAYOUT: &str = "
    . . . A A A . . .
    . . . . A . . . .
    . . . . D . . . .
    A . . . D . . . A
    A A D D K D D A A
    A . . . D . . . A
    . . . . D . . . .
    . . . . A . . . .
    . . . A A A . . .
";

const COPENHAGEN_LAYOUT: &str = "
    . . . A A A A A . . .
    . . . . . A . . . . .
    . . . . . . . . . . .
    A . . . . D . . . . A
    A . . . D D D . . . A
    A A . D D K D D . A A
    A . . . D D D . . . A
    A . . . . D . . . . A
    . . . . . . . . . . .
    . . . . . A . . . . .
    . . . A A A A A . . .
";

const MINI_LAYOUT: &str = "
    . A . A .
    A . D . A
    . D K D .
    A . D . A
    . A . A .
";

/// A named rule set, which fixes the board size and starting layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    /// 9x9 board.
    Historical,
    /// 11x11 board.
    Copenhagen,
    /// 5x5 board, mostly for testing and quick experiments.
    Mini,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Historical, Variant::Copenhagen, Variant::Mini];

    /// Board side length.
    pub fn size(self) -> usize {
        match self {
            Variant::Historical => HISTORICAL_SIZE,
            Variant::Copenhagen => COPENHAGEN_SIZE,
            Variant::Mini => MINI_SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Historical => "historical",
            Variant::Copenhagen => "copenhagen",
            Variant::Mini => "mini",
        }
    }

    fn layout(self) -> &'static str {
        match self {
            Variant::Historical => HISTORICAL_LAYOUT,
            Variant::Copenhagen => COPENHAGEN_LAYOUT,
            Variant::Mini => MINI_LAYOUT,
        }
    }
}

impl FromStr for Variant {
    type Err = TaflError;

    fn from_str(s: &str) -> Result<Self> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaflError::UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A move: slide the piece on `from` in a straight line to the empty cell `to`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Action {
    pub from: Point,
    pub to: Point,
}

impl Action {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    /// Parse `e1-e3` (or `e1 e3`) on a board of the given size.
    pub fn parse(s: &str, size: usize) -> Result<Self> {
        let mut parts = s.split(|c: char| c == '-' || c.is_whitespace()).filter(|p| !p.is_empty());
        let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TaflError::InvalidCoordinate(s.to_string()));
        };
        Ok(Self::new(parse_point(from, size)?, parse_point(to, size)?))
    }

    /// Text form such as `e1-e3`.
    pub fn to_text(self, size: usize) -> String {
        format!("{}-{}", str_point(self.from, size), str_point(self.to, size))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})->({}, {})",
            self.from.0, self.from.1, self.to.0, self.to.1
        )
    }
}

/// Result of a simulated ply (see [`Position::simulate_step`]).
#[derive(Clone, Debug)]
pub struct Step {
    /// The position after the move.
    pub position: Position,
    /// 1.0 if the side that moved has just won, 0.0 otherwise.
    pub reward: f64,
    /// Whether the resulting position is terminal.
    pub done: bool,
    /// Winner of the resulting position, if any.
    pub winner: Option<Player>,
}

/// A tafl position (board state).
///
/// Each position carries its own side to move, so it can be cloned and
/// explored independently of the game it came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    grid: Grid,
    /// Side to move.
    pub turn: Player,
    /// Set once the game has ended; no further moves are generated.
    pub done: bool,
    /// Plies played so far.
    pub move_count: u32,
}

/// Build the starting position for a named variant.
pub fn init_state(variant: &str) -> Result<Position> {
    Ok(Position::new(variant.parse()?))
}

/// Build a position from an ASCII diagram (see [`parse_grid`]).
pub fn parse_board(diagram: &str, turn: Player) -> Result<Position> {
    Ok(Position::from_grid(parse_grid(diagram)?, turn))
}

impl Position {
    /// Starting position of `variant`, attacker to move.
    pub fn new(variant: Variant) -> Self {
        let grid = parse_grid(variant.layout()).expect("built-in layouts are valid");
        Self::from_grid(grid, Player::Attacker)
    }

    /// Wrap an already validated grid. `done` is derived from the board.
    pub fn from_grid(grid: Grid, turn: Player) -> Self {
        let mut pos = Self {
            grid,
            turn,
            done: false,
            move_count: 0,
        };
        pos.done = pos.winner().is_some();
        pos
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.grid.size()
    }

    /// Side to move.
    #[inline]
    pub fn turn(&self) -> Player {
        self.turn
    }

    #[inline]
    pub fn piece_at(&self, p: Point) -> Option<Piece> {
        self.grid.get(p)
    }

    #[inline]
    pub fn king_square(&self) -> Option<Point> {
        self.grid.king_square()
    }

    #[inline]
    pub fn count(&self, player: Player) -> usize {
        self.grid.count(player)
    }

    /// All actions available to the side to move, in row-major source order
    /// and up/down/left/right destination order. Empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Action> {
        let mut moves = Vec::new();
        if self.done {
            return moves;
        }
        for p in self.grid.points() {
            if self.grid.layer(self.turn, p) != EMPTY {
                self.moves_for_piece(p, &mut moves);
            }
        }
        moves
    }

    /// Slide in each direction until the edge or any piece. Only the king may
    /// stop on the throne; other pieces may still pass over it.
    fn moves_for_piece(&self, from: Point, out: &mut Vec<Action>) {
        let is_king = self.grid.get(from) == Some(Piece::King);
        let throne = self.grid.throne();
        for &dir in &DIRECTIONS {
            let mut k = 1;
            while let Some(to) = self.grid.step(from, dir, k) {
                if !self.grid.is_empty(to) {
                    break;
                }
                if is_king || to != throne {
                    out.push(Action::new(from, to));
                }
                k += 1;
            }
        }
    }

    /// Play a move on this position.
    ///
    /// # Errors
    /// [`TaflError::IllegalAction`] if `action` is not in [`legal_moves`](Self::legal_moves);
    /// the position is left untouched in that case.
    pub fn apply_move(&mut self, action: Action) -> Result<Vec<Point>> {
        if !self.legal_moves().contains(&action) {
            return Err(TaflError::IllegalAction { action });
        }
        Ok(self.transition(action))
    }

    /// The position after `action`, leaving `self` untouched.
    ///
    /// The action is not re-validated in release builds; it must come from
    /// [`legal_moves`](Self::legal_moves) of this position.
    pub fn after_move(&self, action: Action) -> Position {
        debug_assert!(
            self.legal_moves().contains(&action),
            "after_move called with illegal action {action}"
        );
        let mut next = self.clone();
        next.transition(action);
        next
    }

    /// Simulate one ply for search: copy, move, and score from the mover's side.
    pub fn simulate_step(&self, action: Action) -> Step {
        let mover = self.turn;
        let position = self.after_move(action);
        let (done, winner) = position.is_terminal();
        Step {
            reward: if winner == Some(mover) { 1.0 } else { 0.0 },
            done,
            winner,
            position,
        }
    }

    /// Move the piece, resolve captures, and hand the turn over.
    /// Returns the cells whose pieces were captured.
    fn transition(&mut self, action: Action) -> Vec<Point> {
        let piece = self.grid.get(action.from);
        self.grid.set(action.from, None);
        self.grid.set(action.to, piece);

        let captured = self.resolve_captures(action);

        self.turn = self.turn.opponent();
        self.move_count += 1;
        if self.is_terminal().0 {
            self.done = true;
        }

        #[cfg(debug_assertions)]
        self.assert_invariants();

        captured
    }

    /// Remove every piece captured by the piece that just arrived on
    /// `action.to`. The mover is `self.turn`, which has not been flipped yet.
    ///
    /// Ordinary pieces are captured first and may fall on several sides at
    /// once. Then at most one king capture is tried: flanked away from the
    /// throne, surrounded on the throne, or boxed in next to it. A king
    /// capture sets `done` immediately.
    fn resolve_captures(&mut self, action: Action) -> Vec<Point> {
        let mover = self.turn;
        let enemy = mover.opponent();
        let dest = action.to;
        let throne = self.grid.throne();
        let king_on_throne = self.grid.layer(Player::Defender, throne) == KING;
        let mut captured = Vec::new();

        for &dir in &DIRECTIONS {
            let (Some(victim), Some(beyond)) =
                (self.grid.step(dest, dir, 1), self.grid.step(dest, dir, 2))
            else {
                continue;
            };
            if self.grid.layer(enemy, victim) != SOLDIER {
                continue;
            }
            let flanked = self.grid.layer(mover, beyond) != EMPTY;
            // The empty throne is hostile to defenders. Compared by equality;
            // an earlier averaging comparison matched whenever either
            // coordinate lined up with the throne.
            let against_throne = mover == Player::Attacker && !king_on_throne && beyond == throne;
            if flanked || against_throne {
                self.grid.set(victim, None);
                captured.push(victim);
            }
        }

        if mover != Player::Attacker {
            return captured;
        }
        let Some(king) = self.grid.king_square() else {
            return captured;
        };

        if self.king_captured(dest, king, king_on_throne) {
            self.grid.set(king, None);
            self.done = true;
            captured.push(king);
        }

        captured
    }

    fn king_captured(&self, dest: Point, king: Point, king_on_throne: bool) -> bool {
        let throne = self.grid.throne();
        let attacker_at =
            |p: Option<Point>| p.is_some_and(|p| self.grid.layer(Player::Attacker, p) == SOLDIER);

        // Flanked on two opposite sides, away from the throne.
        if !king_on_throne
            && DIRECTIONS.iter().any(|&dir| {
                self.grid.step(dest, dir, 1) == Some(king)
                    && attacker_at(self.grid.step(dest, dir, 2))
            })
        {
            return true;
        }

        // Surrounded on all four sides while on the throne.
        if king == throne {
            return self.grid.neighbors(throne).all(|p| attacker_at(Some(p)));
        }

        // Next to the throne: both sides across the throne axis and the far side.
        for &dir in &DIRECTIONS {
            if self.grid.step(throne, dir, 1) != Some(king) {
                continue;
            }
            let across = (dir.1, dir.0);
            return attacker_at(self.grid.step(king, across, 1))
                && attacker_at(self.grid.step(king, across, -1))
                && attacker_at(self.grid.step(king, dir, 1));
        }

        false
    }

    /// Winner of this position: the attacker once the king is gone, the
    /// defender once the king stands on any edge cell.
    pub fn winner(&self) -> Option<Player> {
        match self.grid.king_square() {
            None => Some(Player::Attacker),
            Some(king) if self.grid.on_edge(king) => Some(Player::Defender),
            Some(_) => self.enclosure_winner(),
        }
    }

    /// Whether the game is over, together with its winner.
    #[inline]
    pub fn is_terminal(&self) -> (bool, Option<Player>) {
        let winner = self.winner();
        (winner.is_some(), winner)
    }

    /// Extension point for enclosure victory (attackers sealing every
    /// defender away from the edge). None of the supported rule sets define
    /// its geometry yet, so it never reports a winner.
    pub fn enclosure_winner(&self) -> Option<Player> {
        None
    }

    /// Panic if the board or the flags disagree with the game invariants.
    /// A violation here means a rules bug, not bad input.
    pub fn assert_invariants(&self) {
        if let Err(msg) = self.grid.check_invariants() {
            panic!("invariant violation: {msg}");
        }
        if self.grid.king_square().is_none() && !self.done {
            panic!("invariant violation: king missing but game not over");
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grid)?;
        match self.winner() {
            Some(winner) => write!(f, "Game over: {winner} wins"),
            None => write!(f, "Turn: {}", self.turn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(from: Point, to: Point) -> Action {
        Action::new(from, to)
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("mini".parse::<Variant>(), Ok(Variant::Mini));
        assert_eq!("Copenhagen".parse::<Variant>(), Ok(Variant::Copenhagen));
        assert_eq!(
            "brandubh".parse::<Variant>(),
            Err(TaflError::UnknownVariant("brandubh".into()))
        );
    }

    #[test]
    fn test_initial_piece_counts() {
        let expected = [
            (Variant::Historical, 16, 9),
            (Variant::Copenhagen, 24, 13),
            (Variant::Mini, 8, 5),
        ];
        for (variant, attackers, defenders) in expected {
            let pos = Position::new(variant);
            assert_eq!(pos.size(), variant.size());
            assert_eq!(pos.count(Player::Attacker), attackers, "{variant}");
            assert_eq!(pos.count(Player::Defender), defenders, "{variant}");
            assert_eq!(pos.king_square(), Some(pos.grid().throne()), "{variant}");
            assert_eq!(pos.turn(), Player::Attacker);
            assert!(!pos.done);
        }
    }

    #[test]
    fn test_mini_opening_move_counts() {
        let mut pos = Position::new(Variant::Mini);
        assert_eq!(pos.legal_moves().len(), 24);
        pos.turn = Player::Defender;
        // The king is boxed in by its own soldiers.
        let moves = pos.legal_moves();
        assert_eq!(moves.len(), 12);
        assert!(moves.iter().all(|a| a.from != (2, 2)));
    }

    #[test]
    fn test_only_king_may_stop_on_throne() {
        let pos = parse_board(
            "
            . . . . .
            . . . . .
            D . . . .
            . . K . .
            . . . . .
            ",
            Player::Defender,
        )
        .unwrap();
        let moves = pos.legal_moves();
        // The soldier passes over the throne but cannot stop on it.
        assert!(!moves.contains(&mv((2, 0), (2, 2))));
        assert!(moves.contains(&mv((2, 0), (2, 3))));
        assert!(moves.contains(&mv((3, 2), (2, 2))));
    }

    #[test]
    fn test_apply_move_rejects_illegal() {
        let mut pos = Position::new(Variant::Mini);
        let before = pos.clone();
        let err = pos.apply_move(mv((0, 1), (2, 1))).unwrap_err();
        assert!(matches!(err, TaflError::IllegalAction { .. }));
        assert_eq!(pos, before);
    }

    #[test]
    fn test_after_move_leaves_original() {
        let pos = Position::new(Variant::Mini);
        let next = pos.after_move(mv((0, 1), (0, 0)));
        assert_eq!(pos, Position::new(Variant::Mini));
        assert_eq!(next.turn(), Player::Defender);
        assert_eq!(next.move_count, 1);
        assert_eq!(next.piece_at((0, 0)), Some(Piece::Attacker));
        assert_eq!(next.piece_at((0, 1)), None);
    }

    #[test]
    fn test_king_keeps_marker_when_moving() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . K . . .
            . . . . . . .
            . . . . . . .
            A . . . . . .
            ",
            Player::Defender,
        )
        .unwrap();
        pos.apply_move(mv((3, 3), (3, 2))).unwrap();
        assert_eq!(pos.piece_at((3, 2)), Some(Piece::King));
        assert_eq!(pos.grid().layer(Player::Defender, (3, 2)), KING);
    }

    #[test]
    fn test_custodial_capture_by_defender() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . D A . . . .
            . . . . . . .
            . . . K . . .
            . . . . . . D
            . . . . . . .
            A . . . . . .
            ",
            Player::Defender,
        )
        .unwrap();
        let captured = pos.apply_move(mv((4, 6), (1, 6))).unwrap();
        assert!(captured.is_empty());

        // Slide along row 1 from the right to flank the attacker.
        pos.turn = Player::Defender;
        let captured = pos.apply_move(mv((1, 6), (1, 3))).unwrap();
        assert_eq!(captured, vec![(1, 2)]);
        assert!(pos.grid().is_empty((1, 2)));
    }

    #[test]
    fn test_king_takes_part_in_captures() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . K A . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . D . . A
            ",
            Player::Defender,
        )
        .unwrap();
        // The soldier passes over the empty throne on its way up.
        let captured = pos.apply_move(mv((6, 3), (1, 3))).unwrap();
        assert_eq!(captured, vec![(1, 2)]);
    }

    #[test]
    fn test_throne_assists_attacker_capture() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . . D . .
            . . . . . . .
            . . . . . K .
            . . . . A . .
            ",
            Player::Attacker,
        )
        .unwrap();
        // Throne at (3,3) is empty: defender on (3,4) is caught between it and (3,5).
        let mut attacker_move = pos.clone();
        attacker_move.grid.set((0, 5), Some(Piece::Attacker));
        let captured = attacker_move.apply_move(mv((0, 5), (3, 5))).unwrap();
        assert_eq!(captured, vec![(3, 4)]);

        // The defender side gets no help from the throne.
        pos.grid.set((3, 4), Some(Piece::Attacker));
        pos.grid.set((0, 5), Some(Piece::Defender));
        pos.turn = Player::Defender;
        let captured = pos.apply_move(mv((0, 5), (3, 5))).unwrap();
        assert!(captured.is_empty());
    }

    #[test]
    fn test_occupied_throne_does_not_assist() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . A .
            . . . . . . .
            . . . K D . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            ",
            Player::Attacker,
        )
        .unwrap();
        let captured = pos.apply_move(mv((1, 5), (3, 5))).unwrap();
        assert!(captured.is_empty());
        assert_eq!(pos.piece_at((3, 4)), Some(Piece::Defender));
    }

    #[test]
    fn test_king_captured_away_from_throne() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . . .
            . A K . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . A . . .
            ",
            Player::Attacker,
        )
        .unwrap();
        let captured = pos.apply_move(mv((6, 3), (2, 3))).unwrap();
        assert_eq!(captured, vec![(2, 2)]);
        assert!(pos.done);
        assert_eq!(pos.winner(), Some(Player::Attacker));
        assert!(pos.legal_moves().is_empty());
    }

    #[test]
    fn test_defender_move_never_captures_own_king() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . . .
            . A K . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . D . . .
            ",
            Player::Defender,
        )
        .unwrap();
        pos.apply_move(mv((6, 3), (2, 3))).unwrap();
        assert!(!pos.done);
        assert_eq!(pos.king_square(), Some((2, 2)));
    }

    #[test]
    fn test_king_on_throne_needs_four_attackers() {
        let diagram = "
            . . . . . . .
            . . . . . . .
            . . . A . . .
            . . A K . . A
            . . . A . . .
            . . . . . . .
            . . . . . . .
        ";
        let mut pos = parse_board(diagram, Player::Attacker).unwrap();
        pos.apply_move(mv((3, 6), (3, 5))).unwrap();
        assert!(!pos.done, "three attackers are not enough");

        let mut pos = parse_board(diagram, Player::Attacker).unwrap();
        pos.apply_move(mv((3, 6), (3, 4))).unwrap();
        assert!(pos.done);
        assert_eq!(pos.king_square(), None);
    }

    #[test]
    fn test_king_next_to_throne_needs_three_attackers() {
        let mut pos = parse_board(
            "
            . . . . . . .
            . . . . . . A
            . . A K A . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            ",
            Player::Attacker,
        )
        .unwrap();
        pos.apply_move(mv((1, 6), (1, 3))).unwrap();
        assert!(pos.done);
        assert_eq!(pos.winner(), Some(Player::Attacker));
    }

    #[test]
    fn test_king_escape_ends_game() {
        let mut pos = parse_board(
            "
            . . . . .
            . . . . .
            . . . . .
            . . . K .
            . A . . .
            ",
            Player::Defender,
        )
        .unwrap();
        let step = pos.simulate_step(mv((3, 3), (3, 4)));
        assert!(step.done);
        assert_eq!(step.winner, Some(Player::Defender));
        assert_eq!(step.reward, 1.0);
        assert!(!pos.done, "simulate_step must not touch its input");

        assert_eq!(pos.is_terminal(), (false, None));
        pos.apply_move(mv((3, 3), (4, 3))).unwrap();
        assert_eq!(pos.winner(), Some(Player::Defender));
        assert_eq!(pos.is_terminal(), (true, Some(Player::Defender)));
    }

    #[test]
    fn test_soldier_on_edge_does_not_end_game() {
        let pos = Position::new(Variant::Mini);
        let mut pos = pos.after_move(mv((0, 1), (0, 0)));
        pos.apply_move(mv((1, 2), (0, 2))).unwrap();
        assert!(!pos.done);
        assert_eq!(pos.winner(), None);
    }

    #[test]
    fn test_simulate_step_reward_is_for_mover() {
        let pos = parse_board(
            "
            . . . . . . .
            . . . . . . .
            . A K . A . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            . . . . . . .
            ",
            Player::Attacker,
        )
        .unwrap();
        let step = pos.simulate_step(mv((2, 4), (2, 3)));
        assert_eq!(step.winner, Some(Player::Attacker));
        assert_eq!(step.reward, 1.0);

        let quiet = pos.simulate_step(mv((2, 1), (1, 1)));
        assert!(!quiet.done);
        assert_eq!(quiet.reward, 0.0);
    }

    #[test]
    fn test_action_text_roundtrip() {
        let action = mv((4, 1), (2, 1));
        assert_eq!(action.to_text(5), "b1-b3");
        assert_eq!(Action::parse("b1-b3", 5), Ok(action));
        assert_eq!(Action::parse("b1 b3", 5), Ok(action));
        assert!(Action::parse("b1", 5).is_err());
    }
}
