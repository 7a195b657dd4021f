//! Monte Carlo Tree Search (MCTS) planner with PUCT selection.
//!
//! Each planning pass:
//! 1. Selecting: from the root, follow the edge maximizing `Q + U` until a
//!    leaf, materializing destination nodes lazily. Dirichlet noise is mixed
//!    into the priors at the root only.
//! 2. Expanding: give the leaf one edge per legal move, with priors from the
//!    configured [`PriorPolicy`].
//! 3. Backpropagating: credit the leaf value to every edge on the path, with
//!    the sign flipped for edges played by the other side.
//!
//! Transpositions make the search graph cyclic. A descent that reaches a
//! position already on its own path stops there and backs up a neutral
//! value, so visit counts still grow and the next pass chooses differently.
//!
//! The recommended move is the root edge with the most visits.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Dirichlet, Distribution};
use tracing::{debug, trace, warn};

use crate::board::Player;
use crate::constants::{
    C_PUCT, DIRICHLET_ALPHA, EXPLORATION_FRACTION, MAX_DESCENT, N_SIMS, PLAYOUT_LEN,
};
use crate::playout::playout;
use crate::position::{Action, Position};
use crate::priors::{PriorPolicy, UniformPrior};
use crate::tree::{NodeId, Tree};

/// Planner configuration.
#[derive(Clone, Debug)]
pub struct MctsConfig {
    /// Planning passes per search.
    pub num_simulations: usize,

    /// PUCT exploration constant.
    pub c_puct: f64,

    /// Dirichlet concentration for root noise.
    pub dirichlet_alpha: f64,

    /// Share of the root prior replaced by noise. 0 disables noise.
    pub exploration_fraction: f64,

    /// Edges a single descent may follow before the pass is aborted.
    pub max_descent: usize,

    /// Random playout horizon for non-terminal leaves. 0 disables playouts.
    pub playout_len: usize,

    /// Seed for noise and playouts.
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: N_SIMS,
            c_puct: C_PUCT,
            dirichlet_alpha: DIRICHLET_ALPHA,
            exploration_fraction: EXPLORATION_FRACTION,
            max_descent: MAX_DESCENT,
            playout_len: PLAYOUT_LEN,
            seed: 0,
        }
    }
}

impl MctsConfig {
    /// Create a new config with the specified number of passes.
    pub fn with_simulations(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Default::default()
        }
    }

    /// Create a config without root noise, for evaluation and tests.
    pub fn for_evaluation(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            exploration_fraction: 0.0,
            ..Default::default()
        }
    }
}

/// An edge on a selection path: edge `edge` of node `node`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRef {
    pub node: NodeId,
    pub edge: usize,
}

/// How a planning pass ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassOutcome {
    /// A leaf was expanded and its value backed up.
    Expanded { depth: usize, value: f64 },
    /// Selection ended on a terminal node; its result was backed up.
    Terminal { depth: usize, winner: Player },
    /// Selection returned to a position already on the path; a neutral
    /// value was backed up.
    Repeated { depth: usize },
    /// The descent cap was hit; no statistics were changed.
    Aborted { depth: usize },
}

/// Result of [`Mcts::search`].
#[derive(Clone, Debug)]
pub struct SearchSummary {
    /// Passes run.
    pub passes: usize,
    /// Passes that hit the descent cap.
    pub aborted: usize,
    /// Passes that stopped on a position already on their path.
    pub repeated: usize,
    /// Distinct positions in the tree afterwards.
    pub tree_size: usize,
    /// Most visited root move, if the root has any.
    pub best_move: Option<Action>,
    /// Visit count of every root move.
    pub visits: Vec<(Action, u32)>,
}

/// Monte Carlo Tree Search planner.
pub struct Mcts<P: PriorPolicy = UniformPrior> {
    config: MctsConfig,
    prior: P,
    rng: ChaCha8Rng,
    playout_rng: fastrand::Rng,
}

impl Mcts<UniformPrior> {
    /// Planner with uniform priors.
    pub fn new(config: MctsConfig) -> Self {
        Self::with_prior(config, UniformPrior)
    }
}

impl<P: PriorPolicy> Mcts<P> {
    pub fn with_prior(config: MctsConfig, prior: P) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            playout_rng: fastrand::Rng::with_seed(config.seed),
            config,
            prior,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Build a fresh tree for `position` and search it.
    pub fn think(&mut self, position: &Position) -> SearchSummary {
        let mut tree = Tree::new(position.clone());
        self.search(&mut tree)
    }

    /// Run `num_simulations` passes over `tree`.
    pub fn search(&mut self, tree: &mut Tree) -> SearchSummary {
        let mut aborted = 0;
        let mut repeated = 0;
        for _ in 0..self.config.num_simulations {
            match self.run_pass(tree) {
                PassOutcome::Aborted { .. } => aborted += 1,
                PassOutcome::Repeated { .. } => repeated += 1,
                _ => {}
            }
        }

        let summary = SearchSummary {
            passes: self.config.num_simulations,
            aborted,
            repeated,
            tree_size: tree.len(),
            best_move: best_move(tree),
            visits: tree
                .root_edges()
                .iter()
                .map(|e| (e.action, e.stats.n))
                .collect(),
        };
        debug!(
            passes = summary.passes,
            aborted = summary.aborted,
            repeated = summary.repeated,
            tree_size = summary.tree_size,
            root_visits = tree.root().visits(),
            "search finished"
        );
        summary
    }

    /// One select, expand, backpropagate cycle starting at the root.
    pub fn run_pass(&mut self, tree: &mut Tree) -> PassOutcome {
        let mut path: Vec<EdgeRef> = Vec::new();
        let mut on_path: HashSet<NodeId> = HashSet::from([NodeId::ROOT]);
        let mut current = NodeId::ROOT;
        let mut reused = 0;

        while !tree.get(current).is_leaf() {
            if path.len() >= self.config.max_descent {
                warn!(depth = path.len(), "descent cap reached, pass aborted");
                return PassOutcome::Aborted { depth: path.len() };
            }
            let edge = self.select_edge(tree, current, current == NodeId::ROOT);
            let (dest, was_reused) = tree.materialize(current, edge);
            if was_reused {
                reused += 1;
            }
            path.push(EdgeRef {
                node: current,
                edge,
            });
            if !on_path.insert(dest) {
                let depth = path.len();
                let turn = tree.get(dest).turn;
                backpropagate(tree, &path, 0.0, turn);
                trace!(depth, reused, "pass revisited a position on its path");
                return PassOutcome::Repeated { depth };
            }
            current = dest;
        }

        let depth = path.len();
        if let Some(winner) = tree.get(current).winner {
            backpropagate(tree, &path, 1.0, winner);
            trace!(depth, %winner, "pass reached terminal node");
            return PassOutcome::Terminal { depth, winner };
        }

        let edges = tree.expand(current, &self.prior);
        let (value, beneficiary) = self.evaluate(&tree.get(current).position);
        backpropagate(tree, &path, value, beneficiary);
        trace!(depth, edges, value, reused, "pass expanded leaf");
        PassOutcome::Expanded { depth, value }
    }

    /// Index of the edge of `id` with the highest `Q + U`; the first one wins ties.
    fn select_edge(&mut self, tree: &Tree, id: NodeId, at_root: bool) -> usize {
        let node = tree.get(id);
        let len = node.edges.len();
        let (epsilon, noise) = if at_root && self.config.exploration_fraction > 0.0 {
            (self.config.exploration_fraction, self.sample_noise(len))
        } else {
            (0.0, vec![0.0; len])
        };

        let sqrt_total = (node.visits() as f64).sqrt();
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, edge) in node.edges.iter().enumerate() {
            let prior = (1.0 - epsilon) * edge.stats.p + epsilon * noise[i];
            let u = self.config.c_puct * prior * sqrt_total / (1.0 + edge.stats.n as f64);
            let score = edge.stats.q + u;
            if score > best_score {
                best_score = score;
                best = i;
            }
        }
        best
    }

    /// Dirichlet noise over `len` edges. Degenerate sizes get a flat vector.
    fn sample_noise(&mut self, len: usize) -> Vec<f64> {
        if len < 2 {
            return vec![1.0; len];
        }
        let alpha = vec![self.config.dirichlet_alpha; len];
        match Dirichlet::new(&alpha) {
            Ok(dirichlet) => dirichlet.sample(&mut self.rng),
            Err(_) => vec![1.0 / len as f64; len],
        }
    }

    /// Heuristic value of a non-terminal leaf and the side it is credited to.
    fn evaluate(&mut self, position: &Position) -> (f64, Player) {
        if self.config.playout_len == 0 {
            return (0.0, position.turn());
        }
        match playout(position, self.config.playout_len, &mut self.playout_rng) {
            Some(winner) => (1.0, winner),
            None => (0.0, position.turn()),
        }
    }
}

/// Credit `value` to `beneficiary` along `path`.
///
/// Each edge gains one visit; its accumulated value grows by `value` if the
/// edge was played by `beneficiary` and shrinks by it otherwise, so every
/// `Q` reads as the expected result for the side that made that move.
pub fn backpropagate(tree: &mut Tree, path: &[EdgeRef], value: f64, beneficiary: Player) {
    for r in path {
        let edge = &mut tree.get_mut(r.node).edges[r.edge];
        let signed = if edge.mover == beneficiary { value } else { -value };
        let stats = &mut edge.stats;
        stats.n += 1;
        stats.w += signed;
        stats.q = stats.w / stats.n as f64;
    }
}

/// The root move with the most visits, the earliest one on ties.
/// `None` if the root has not been expanded or has no moves.
pub fn best_move(tree: &Tree) -> Option<Action> {
    let mut best: Option<(Action, u32)> = None;
    for edge in tree.root_edges() {
        if best.is_none_or(|(_, n)| edge.stats.n > n) {
            best = Some((edge.action, edge.stats.n));
        }
    }
    best.map(|(action, _)| action)
}
