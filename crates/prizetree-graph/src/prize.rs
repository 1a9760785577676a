use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use prizetree_core::{Polarity, PrizeMode, PrizeTreeError, Result};

use crate::graph::WeightedGraph;
use crate::io;

/// Attaches the `prize` attribute to network nodes from a raw prize table.
///
/// A node id containing an underscore is resolved through the prefix before
/// the first `_` only; other ids are looked up directly. Nodes with no
/// match get no attribute, silently.
pub fn resolve_node_prizes(graph: &mut WeightedGraph, prizes: &HashMap<String, f64>) {
    debug!("Resolving node prizes");

    let resolved: Vec<(String, f64)> = graph
        .node_ids()
        .filter_map(|node| {
            let prize = match node.split_once('_') {
                Some((prefix, _)) => prizes.get(prefix),
                None => prizes.get(node.as_str()),
            };
            prize.map(|p| (node.clone(), *p))
        })
        .collect();

    for (node, prize) in resolved {
        if let Some(attrs) = graph.node_mut(&node) {
            attrs.prize = Some(prize);
        }
    }
}

/// Writes `scaled_prize = prize * beta` for every node that has a prize.
pub fn scale_node_prizes(graph: &mut WeightedGraph, beta: f64) {
    debug!("Scaling node prizes by {}", beta);

    let scaled: Vec<(String, f64)> = graph
        .prizes()
        .into_iter()
        .map(|(node, prize)| (node, beta * prize))
        .collect();
    for (node, value) in scaled {
        if let Some(attrs) = graph.node_mut(&node) {
            attrs.scaled_prize = Some(value);
        }
    }
}

/// Maps each element to the number of sets it appears in.
pub fn find_counts(set_list: &[HashSet<String>]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for set in set_list {
        for element in set {
            *counts.entry(element.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Maps each element to the fraction of sets it appears in, in `[0, 1]`.
/// An empty set list yields an empty table, not a division error.
pub fn find_frequency(set_list: &[HashSet<String>]) -> HashMap<String, f64> {
    if set_list.is_empty() {
        return HashMap::new();
    }
    let n = set_list.len() as f64;
    find_counts(set_list)
        .into_iter()
        .map(|(key, count)| (key, count as f64 / n))
        .collect()
}

/// Computes the frequency-based artificial prize for every node the mode
/// covers. Negative polarity covers the whole network with missing
/// frequencies read as 0; positive polarity covers only nodes that have a
/// frequency entry; no polarity keyword yields an empty map.
pub fn compute_artificial_prizes(
    graph: &WeightedGraph,
    const_sets: &[HashSet<String>],
    lambda: f64,
    alpha: f64,
    mode: &PrizeMode,
) -> Result<BTreeMap<String, f64>> {
    debug!("Finding node frequencies in constraining networks");
    let node_freqs = find_frequency(const_sets);

    debug!(
        "Computing artificial prizes, lambda = {}, alpha = {}, mode = {}",
        lambda, alpha, mode
    );
    let mut art_prizes = BTreeMap::new();
    match mode.polarity() {
        Polarity::Negative => {
            for node in graph.node_ids() {
                let freq = node_freqs.get(node).copied().unwrap_or(0.0);
                art_prizes.insert(node.clone(), -lambda * (1.0 - freq).powf(alpha));
            }
        }
        Polarity::Positive => {
            for (node, freq) in &node_freqs {
                art_prizes.insert(node.clone(), lambda * freq.powf(alpha));
            }
        }
        Polarity::None => {
            debug!("Prize mode \"{}\" names no polarity; no base prizes", mode);
        }
    }

    if mode.proportional && !art_prizes.is_empty() {
        let prizes = graph.prizes();
        if prizes.is_empty() {
            return Err(PrizeTreeError::Graph(
                "proportional prize mode requires at least one resolved prize".to_string(),
            ));
        }
        let min_prize = prizes.values().copied().fold(f64::INFINITY, f64::min);
        for (node, value) in art_prizes.iter_mut() {
            let scale = prizes.get(node).copied().unwrap_or(min_prize);
            *value *= scale;
        }
    }

    Ok(art_prizes)
}

/// Merges artificial prizes into the scaled prizes: sum where a scaled
/// prize exists, the artificial prize alone where it does not. The merged
/// value lands in `const_prize` for nodes present in the network.
pub fn update_org_prizes(graph: &mut WeightedGraph, art_prizes: &BTreeMap<String, f64>) {
    debug!("Updating the original prizes");

    let mut merged = graph.scaled_prizes();
    for (node, value) in art_prizes {
        match merged.get_mut(node) {
            Some(prize) => *prize += value,
            None => {
                merged.insert(node.clone(), *value);
            }
        }
    }

    for (node, prize) in merged {
        if let Some(attrs) = graph.node_mut(&node) {
            attrs.const_prize = Some(prize);
        }
    }
}

/// Constrains the node prizes of a network using evidence from other
/// networks: computes artificial prizes, optionally persists them as
/// `key<TAB>value` lines, and merges them into `const_prize`.
pub fn constrain_prizes(
    graph: &mut WeightedGraph,
    const_sets: &[HashSet<String>],
    lambda: f64,
    alpha: f64,
    mode: &PrizeMode,
    art_prizes_file: Option<&Path>,
) -> Result<()> {
    debug!("Begin computing new node prizes");

    let art_prizes = compute_artificial_prizes(graph, const_sets, lambda, alpha, mode)?;

    if let Some(path) = art_prizes_file {
        debug!("Saving artificial prizes to {}", path.display());
        io::write_tab_dict(path, art_prizes.iter())?;
    }

    update_org_prizes(graph, &art_prizes);

    debug!("New prizes computed");
    Ok(())
}
