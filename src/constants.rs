//! Constants for variant geometry, piece markers, and planner parameters.
//!
//! Board sizes are fixed per rule set; the geometry of a game lives on its
//! [`Position`](crate::position::Position) at runtime.
//! Everything here is a default that callers may override through
//! [`MctsConfig`](crate::mcts::MctsConfig) or the command line.

// =============================================================================
// Board Geometry
// =============================================================================

/// Side length of the `mini` variant.
pub const MINI_SIZE: usize = 5;

/// Side length of the `historical` variant.
pub const HISTORICAL_SIZE: usize = 9;

/// Side length of the `copenhagen` variant.
pub const COPENHAGEN_SIZE: usize = 11;

/// Orthogonal step offsets as (row, col) deltas.
/// Order: Up, Down, Left, Right
pub const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

// =============================================================================
// Cell Markers
// =============================================================================

/// Empty cell in either layer.
pub const EMPTY: u8 = 0;

/// Ordinary piece (attacker or defender soldier).
pub const SOLDIER: u8 = 1;

/// King marker, only ever found in the defender layer.
pub const KING: u8 = 2;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Default number of planning passes per move.
pub const N_SIMS: usize = 800;

/// PUCT exploration constant.
pub const C_PUCT: f64 = 1.0;

/// Dirichlet concentration for root exploration noise.
pub const DIRICHLET_ALPHA: f64 = 0.8;

/// Share of the root prior replaced by Dirichlet noise.
pub const EXPLORATION_FRACTION: f64 = 0.2;

/// Maximum edges a single selection descent may follow before the pass is
/// aborted. Descents already stop on repeated positions; this only bounds
/// very long acyclic paths.
pub const MAX_DESCENT: usize = 1000;

// =============================================================================
// Playout Parameters
// =============================================================================

/// Default playout horizon. Zero disables playouts, so non-terminal leaves
/// back up a value of 0.
pub const PLAYOUT_LEN: usize = 0;

/// Hard ceiling on any configured playout horizon.
pub const MAX_PLAYOUT_LEN: usize = 500;

// =============================================================================
// Prior Weights
// =============================================================================

/// Base weight every legal move receives.
pub const PRIOR_EVEN: f64 = 1.0;

/// Weight added per enemy piece a move would capture.
pub const PRIOR_CAPTURE: f64 = 3.0;

/// Weight added to a king move that lands on the edge (immediate escape).
pub const PRIOR_KING_ESCAPE: f64 = 50.0;

/// Weight added to a move that captures the king.
pub const PRIOR_KING_CAPTURE: f64 = 50.0;
