//! Search tree storage: nodes, edges, and the fingerprint registry.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every node is
//! also registered under the [`Fingerprint`] of its position, so an expansion
//! that reaches a position already in the tree links to the existing node
//! instead of creating a duplicate. This makes the tree a graph: edges may
//! point back to ancestors, which is why selection bounds its descent.

use std::collections::HashMap;

use crate::board::Player;
use crate::position::{Action, Position};
use crate::priors::PriorPolicy;

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// Identity of a position: piece kind per cell plus the side to move.
///
/// Two positions with the same fingerprint have the same legal moves and
/// the same future, so they can share a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(Box<[u8]>);

impl Fingerprint {
    pub fn of(position: &Position) -> Self {
        let mut bytes: Vec<u8> = position.grid().occupancy().collect();
        bytes.push(position.turn().index() as u8);
        Self(bytes.into_boxed_slice())
    }
}

/// Mutable statistics of an edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStats {
    /// Visit count.
    pub n: u32,
    /// Accumulated value.
    pub w: f64,
    /// Mean value (`w / n`), 0 until visited.
    pub q: f64,
    /// Prior probability, fixed at creation.
    pub p: f64,
}

impl EdgeStats {
    pub fn new(prior: f64) -> Self {
        Self {
            n: 0,
            w: 0.0,
            q: 0.0,
            p: prior,
        }
    }
}

/// A transition out of a node.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Move that produces the transition.
    pub action: Action,
    /// Side that plays `action`.
    pub mover: Player,
    /// Destination node, materialized on first traversal.
    pub dest: Option<NodeId>,
    pub stats: EdgeStats,
}

/// A search node: one position and its outgoing edges.
#[derive(Clone, Debug)]
pub struct Node {
    pub position: Position,
    pub fingerprint: Fingerprint,
    /// Side to move at this node.
    pub turn: Player,
    /// Winner if the position is terminal.
    pub winner: Option<Player>,
    pub edges: Vec<Edge>,
    /// Whether edges have been generated (a terminal or blocked node may be
    /// expanded and still have none).
    pub expanded: bool,
}

impl Node {
    fn new(position: Position) -> Self {
        Self {
            fingerprint: Fingerprint::of(&position),
            turn: position.turn(),
            winner: position.winner(),
            edges: Vec::new(),
            expanded: false,
            position,
        }
    }

    /// A node without edges: unexpanded, terminal, or out of moves.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of visit counts over all outgoing edges.
    pub fn visits(&self) -> u32 {
        self.edges.iter().map(|e| e.stats.n).sum()
    }
}

/// Arena-allocated search graph with a fingerprint registry.
///
/// Nodes are never removed; a tree only grows until it is dropped.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    index: HashMap<Fingerprint, NodeId>,
}

impl Tree {
    /// Create a tree holding only the (unexpanded) root.
    pub fn new(root: Position) -> Self {
        let node = Node::new(root);
        let mut index = HashMap::new();
        index.insert(node.fingerprint.clone(), NodeId::ROOT);
        Self {
            nodes: vec![node],
            index,
        }
    }

    /// # Panics
    /// Panics if the NodeId is invalid.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// # Panics
    /// Panics if the NodeId is invalid.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    #[inline]
    pub fn root(&self) -> &Node {
        self.get(NodeId::ROOT)
    }

    /// Read-only view of the root's outgoing edges.
    pub fn root_edges(&self) -> &[Edge] {
        &self.root().edges
    }

    /// Number of distinct positions in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node already registered for `fingerprint`, if any.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<NodeId> {
        self.index.get(fingerprint).copied()
    }

    /// Register `position`, reusing the existing node when its fingerprint is
    /// already known. Returns the node and whether it was reused.
    pub fn insert(&mut self, position: Position) -> (NodeId, bool) {
        let fingerprint = Fingerprint::of(&position);
        if let Some(id) = self.lookup(&fingerprint) {
            return (id, true);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(position));
        self.index.insert(fingerprint, id);
        (id, false)
    }

    /// Generate one edge per legal move of `id`, with priors from `prior`.
    ///
    /// Does nothing if the node was already expanded. Returns the number of
    /// edges created.
    pub fn expand<P: PriorPolicy + ?Sized>(&mut self, id: NodeId, prior: &P) -> usize {
        let node = self.get(id);
        if node.expanded {
            return 0;
        }
        let moves = node.position.legal_moves();
        let priors = prior.priors(&node.position, &moves);
        debug_assert_eq!(priors.len(), moves.len());

        let mover = node.turn;
        let edges: Vec<Edge> = moves
            .into_iter()
            .zip(priors)
            .map(|(action, p)| Edge {
                action,
                mover,
                dest: None,
                stats: EdgeStats::new(p),
            })
            .collect();

        let node = self.get_mut(id);
        node.edges = edges;
        node.expanded = true;
        node.edges.len()
    }

    /// Destination of edge `edge` of node `id`, simulating the move and
    /// registering the resulting position on first use.
    /// Returns the destination and whether an existing node was reused.
    pub fn materialize(&mut self, id: NodeId, edge: usize) -> (NodeId, bool) {
        let node = self.get(id);
        if let Some(dest) = node.edges[edge].dest {
            return (dest, false);
        }
        let step = node.position.simulate_step(node.edges[edge].action);
        let (dest, reused) = self.insert(step.position);
        self.get_mut(id).edges[edge].dest = Some(dest);
        (dest, reused)
    }
}
