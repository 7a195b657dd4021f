//! Hnef-Rust: a Hnefatafl rules engine with a Monte Carlo Tree Search planner.
//!
//! The rules engine is a deterministic state machine over two-layer boards;
//! the planner searches it with PUCT selection over a transposition-aware
//! tree.
//!
//! ## Modules
//!
//! - [`constants`] - Variant geometry and planner defaults
//! - [`error`] - Error type for configuration and illegal moves
//! - [`board`] - Two-layer grid, players, pieces and coordinates
//! - [`position`] - Game state and rules (moves, captures, victory)
//! - [`tree`] - Search nodes, edges and the fingerprint registry
//! - [`priors`] - Prior policies for new edges
//! - [`playout`] - Random game simulation for leaf evaluation
//! - [`mcts`] - Monte Carlo Tree Search with PUCT
//! - [`protocol`] - Text protocol driver
//!
//! ## Example
//!
//! ```
//! use hnef_rust::mcts::{Mcts, MctsConfig, best_move};
//! use hnef_rust::position::init_state;
//! use hnef_rust::tree::Tree;
//!
//! // Set up a game
//! let pos = init_state("mini").unwrap();
//!
//! // Run MCTS to pick the attacker's first move
//! let mut tree = Tree::new(pos.clone());
//! let mut mcts = Mcts::new(MctsConfig::with_simulations(100));
//! mcts.search(&mut tree);
//! let best = best_move(&tree).unwrap();
//! println!("Best move: {}", best.to_text(pos.size()));
//! ```

pub mod board;
pub mod constants;
pub mod error;
pub mod mcts;
pub mod playout;
pub mod position;
pub mod priors;
pub mod protocol;
pub mod tree;
