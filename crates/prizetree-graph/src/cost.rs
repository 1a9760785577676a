use tracing::debug;

use prizetree_core::CostMode;

use crate::graph::WeightedGraph;

/// Derives the `cost` attribute of every edge from its weight under the
/// given mode. Weights themselves are left untouched.
pub fn compute_edge_costs(graph: &mut WeightedGraph, mode: CostMode) {
    debug!("Computing edge costs, mode {}", mode);
    for (_, attrs) in graph.edges_mut() {
        attrs.cost = Some(mode.cost(attrs.weight));
    }
}
