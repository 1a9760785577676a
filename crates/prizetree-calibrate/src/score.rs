use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use prizetree_core::Result;
use prizetree_graph::io::read_edgelist;

/// Loads the ground-truth gene list: whitespace/newline-separated ids.
/// Used only to score calibration trials, never inside the solver.
pub fn read_ground_truth(path: &Path) -> Result<HashSet<String>> {
    debug!("Reading ground truth from {}", path.display());
    let content = fs::read_to_string(path)?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Reads the node set of a persisted cluster (a tab-delimited edge list).
pub fn cluster_nodes(path: &Path) -> Result<HashSet<String>> {
    let tree = read_edgelist(path)?;
    Ok(tree.nodes().cloned().collect())
}

/// Fraction of result nodes that are ground-truth genes. An empty result
/// scores 0 rather than dividing by zero; an empty trial is a regression
/// signal like any other bad trial.
pub fn overlap_score(ground_truth: &HashSet<String>, result_nodes: &HashSet<String>) -> f64 {
    if result_nodes.is_empty() {
        return 0.0;
    }
    let hits = result_nodes
        .iter()
        .filter(|node| ground_truth.contains(*node))
        .count();
    hits as f64 / result_nodes.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_result_scores_zero() {
        assert_eq!(overlap_score(&set(&["A"]), &HashSet::new()), 0.0);
    }

    #[test]
    fn overlap_is_hit_fraction_of_result() {
        let ground = set(&["A", "B", "X"]);
        let result = set(&["A", "B", "C", "D"]);
        assert_relative_eq!(overlap_score(&ground, &result), 0.5);
    }

    #[test]
    fn disjoint_sets_score_zero() {
        assert_eq!(overlap_score(&set(&["A"]), &set(&["B", "C"])), 0.0);
    }

    #[test]
    fn ground_truth_reads_whitespace_separated_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ground.txt");
        fs::write(&path, "CHD8\nSCN2A GRIN2B\n").unwrap();
        let ground = read_ground_truth(&path).unwrap();
        assert_eq!(ground.len(), 3);
        assert!(ground.contains("GRIN2B"));
    }
}
