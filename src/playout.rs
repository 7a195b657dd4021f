//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays uniformly random legal moves from a position until the
//! game ends or the horizon runs out. The planner uses the outcome as the
//! heuristic value of a freshly expanded, non-terminal leaf.

use crate::board::Player;
use crate::constants::MAX_PLAYOUT_LEN;
use crate::position::Position;

/// Play random moves from `position` for at most `max_len` plies.
///
/// Returns the winner, or `None` if the horizon was reached or the side to
/// move ran out of moves first. The input position is never modified.
pub fn playout(position: &Position, max_len: usize, rng: &mut fastrand::Rng) -> Option<Player> {
    let mut pos = position.clone();

    for _ in 0..max_len.min(MAX_PLAYOUT_LEN) {
        if pos.done {
            break;
        }
        let moves = pos.legal_moves();
        if moves.is_empty() {
            return None;
        }
        let action = moves[rng.usize(..moves.len())];
        pos = pos.after_move(action);
    }

    pos.winner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Variant, parse_board};

    #[test]
    fn test_playout_terminal_position() {
        let pos = parse_board(
            "
            . . K
            . . .
            . A .
            ",
            Player::Attacker,
        )
        .unwrap();
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(playout(&pos, 10, &mut rng), Some(Player::Defender));
    }

    #[test]
    fn test_playout_zero_horizon() {
        let pos = Position::new(Variant::Mini);
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(playout(&pos, 0, &mut rng), None);
    }

    #[test]
    fn test_playout_is_deterministic_per_seed() {
        let pos = Position::new(Variant::Mini);
        let a = playout(&pos, 200, &mut fastrand::Rng::with_seed(7));
        let b = playout(&pos, 200, &mut fastrand::Rng::with_seed(7));
        assert_eq!(a, b);
        assert_eq!(pos, Position::new(Variant::Mini));
    }
}
