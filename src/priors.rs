//! Move priors for edge initialization.
//!
//! Priors are consumed as given numbers: a policy network, a hand-written
//! heuristic, or a flat distribution all plug in through [`PriorPolicy`].

use crate::board::Player;
use crate::constants::{PRIOR_CAPTURE, PRIOR_EVEN, PRIOR_KING_CAPTURE, PRIOR_KING_ESCAPE};
use crate::position::{Action, Position};

/// Source of prior probabilities for the legal moves of a position.
pub trait PriorPolicy {
    /// One prior per entry of `moves`, in the same order. Each must lie in
    /// `[0, 1]`; they should sum to 1 when `moves` is non-empty.
    fn priors(&self, position: &Position, moves: &[Action]) -> Vec<f64>;
}

impl<P: PriorPolicy + ?Sized> PriorPolicy for Box<P> {
    fn priors(&self, position: &Position, moves: &[Action]) -> Vec<f64> {
        (**self).priors(position, moves)
    }
}

/// Every legal move is equally likely.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformPrior;

impl PriorPolicy for UniformPrior {
    fn priors(&self, _position: &Position, moves: &[Action]) -> Vec<f64> {
        let p = 1.0 / moves.len().max(1) as f64;
        vec![p; moves.len()]
    }
}

/// Favours moves that capture pieces or end the game.
///
/// Each move starts at [`PRIOR_EVEN`] and gains a bonus per captured piece
/// and for winning outright; weights are normalized to sum to 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicPrior;

impl HeuristicPrior {
    fn weight(position: &Position, action: Action) -> f64 {
        let mover = position.turn();
        let enemy = mover.opponent();
        let next = position.after_move(action);

        let mut weight = PRIOR_EVEN;
        let taken = position.count(enemy).saturating_sub(next.count(enemy));
        match next.winner() {
            Some(Player::Defender) if mover == Player::Defender => weight += PRIOR_KING_ESCAPE,
            Some(Player::Attacker) if mover == Player::Attacker => {
                weight += PRIOR_KING_CAPTURE;
            }
            _ => weight += PRIOR_CAPTURE * taken as f64,
        }
        weight
    }
}

impl PriorPolicy for HeuristicPrior {
    fn priors(&self, position: &Position, moves: &[Action]) -> Vec<f64> {
        let weights: Vec<f64> = moves.iter().map(|&a| Self::weight(position, a)).collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return UniformPrior.priors(position, moves);
        }
        weights.into_iter().map(|w| w / total).collect()
    }
}
