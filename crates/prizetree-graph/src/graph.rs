use std::collections::{BTreeMap, BTreeSet};

use prizetree_core::NodeId;

/// Per-node attributes, each produced by exactly one pipeline stage and
/// immutable once written for that run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAttrs {
    /// Resolved raw prize; absent for nodes with no match in the prize table.
    pub prize: Option<f64>,
    /// `prize * beta`.
    pub scaled_prize: Option<f64>,
    /// `scaled_prize + artificial_prize`; the only value handed to the solver.
    pub const_prize: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttrs {
    /// Raw edge weight as loaded; never mutated.
    pub weight: f64,
    /// Solver cost derived from the weight under the configured cost mode.
    pub cost: Option<f64>,
}

/// Undirected edge key with lexicographically ordered endpoints, so
/// `(u, v)` and `(v, u)` address the same edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    a: NodeId,
    b: NodeId,
}

impl EdgeKey {
    pub fn new(u: impl Into<NodeId>, v: impl Into<NodeId>) -> Self {
        let (u, v) = (u.into(), v.into());
        if u <= v {
            Self { a: u, b: v }
        } else {
            Self { a: v, b: u }
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

/// In-memory undirected graph with per-node prize attributes and per-edge
/// weight/cost attributes. Backed by ordered maps so that iteration, and
/// therefore every serialized artifact, is deterministic.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    nodes: BTreeMap<NodeId, NodeAttrs>,
    edges: BTreeMap<EdgeKey, EdgeAttrs>,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<NodeId>) -> &mut NodeAttrs {
        self.nodes.entry(id.into()).or_default()
    }

    /// Inserts an undirected edge, creating missing endpoints. A repeated
    /// insert overwrites the weight and clears any derived cost.
    pub fn add_edge(&mut self, u: impl Into<NodeId>, v: impl Into<NodeId>, weight: f64) {
        let key = EdgeKey::new(u, v);
        let (a, b) = key.endpoints();
        let (a, b) = (a.to_string(), b.to_string());
        self.nodes.entry(a).or_default();
        self.nodes.entry(b).or_default();
        self.edges.insert(key, EdgeAttrs { weight, cost: None });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeAttrs> {
        self.nodes.get_mut(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeAttrs)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &EdgeAttrs)> {
        self.edges.iter()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = (&EdgeKey, &mut EdgeAttrs)> {
        self.edges.iter_mut()
    }

    /// Projects one optional node attribute into a map over the nodes that
    /// have it, like an attribute lookup on the whole graph.
    pub fn node_attr_map(&self, get: impl Fn(&NodeAttrs) -> Option<f64>) -> BTreeMap<NodeId, f64> {
        self.nodes
            .iter()
            .filter_map(|(id, attrs)| get(attrs).map(|v| (id.clone(), v)))
            .collect()
    }

    pub fn prizes(&self) -> BTreeMap<NodeId, f64> {
        self.node_attr_map(|a| a.prize)
    }

    pub fn scaled_prizes(&self) -> BTreeMap<NodeId, f64> {
        self.node_attr_map(|a| a.scaled_prize)
    }

    pub fn const_prizes(&self) -> BTreeMap<NodeId, f64> {
        self.node_attr_map(|a| a.const_prize)
    }

    /// Edge costs keyed by endpoints; edges without a computed cost are
    /// omitted.
    pub fn edge_costs(&self) -> BTreeMap<EdgeKey, f64> {
        self.edges
            .iter()
            .filter_map(|(k, attrs)| attrs.cost.map(|c| (k.clone(), c)))
            .collect()
    }
}

/// The tree returned by the solver: an undirected subgraph of the input
/// network, kept as plain node/edge sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTree {
    nodes: BTreeSet<NodeId>,
    edges: BTreeSet<EdgeKey>,
}

impl ResultTree {
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<NodeId>,
    {
        let mut tree = Self::default();
        for (u, v) in edges {
            tree.add_edge(u, v);
        }
        tree
    }

    pub fn add_edge(&mut self, u: impl Into<NodeId>, v: impl Into<NodeId>) {
        let key = EdgeKey::new(u, v);
        let (a, b) = key.endpoints();
        self.nodes.insert(a.to_string());
        self.nodes.insert(b.to_string());
        self.edges.insert(key);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|k| k.endpoints())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_orientation_free() {
        assert_eq!(EdgeKey::new("B", "A"), EdgeKey::new("A", "B"));
        assert!(EdgeKey::new("X", "X").is_self_loop());
    }

    #[test]
    fn add_edge_creates_endpoints() {
        let mut g = WeightedGraph::new();
        g.add_edge("A", "B", 0.5);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.contains_node("A"));
        assert!(g.contains_node("B"));
    }

    #[test]
    fn duplicate_edge_collapses_to_one() {
        let mut g = WeightedGraph::new();
        g.add_edge("A", "B", 0.5);
        g.add_edge("B", "A", 0.9);
        assert_eq!(g.edge_count(), 1);
        let (_, attrs) = g.edges().next().unwrap();
        assert_eq!(attrs.weight, 0.9);
    }

    #[test]
    fn attr_maps_skip_absent_values() {
        let mut g = WeightedGraph::new();
        g.add_edge("A", "B", 1.0);
        g.node_mut("A").unwrap().prize = Some(2.0);
        let prizes = g.prizes();
        assert_eq!(prizes.len(), 1);
        assert_eq!(prizes["A"], 2.0);
    }

    #[test]
    fn result_tree_dedupes_reversed_edges() {
        let tree = ResultTree::from_edges(vec![("A", "B"), ("B", "A"), ("B", "C")]);
        assert_eq!(tree.edge_count(), 2);
        assert_eq!(tree.node_count(), 3);
    }
}
