pub mod cost;
pub mod graph;
pub mod io;
pub mod prize;

pub use cost::compute_edge_costs;
pub use graph::{EdgeAttrs, EdgeKey, NodeAttrs, ResultTree, WeightedGraph};
pub use prize::{
    compute_artificial_prizes, constrain_prizes, find_counts, find_frequency, resolve_node_prizes,
    scale_node_prizes, update_org_prizes,
};
