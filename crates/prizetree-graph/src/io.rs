use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use prizetree_core::{PrizeTreeError, Result};

use crate::graph::{ResultTree, WeightedGraph};

/// Formats a float the way the text formats expect: integral values keep a
/// trailing `.0` (`2` becomes `2.0`), everything else uses the shortest
/// round-trip representation.
pub fn fmt_float(v: f64) -> String {
    if v.is_finite() && v == v.trunc() {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Reads a network from edge-list lines `<u> <v> <weight>`. Blank lines and
/// `#` comments are skipped.
pub fn read_network(path: &Path, upper: bool) -> Result<WeightedGraph> {
    debug!("Reading network from {}", path.display());

    let mut graph = WeightedGraph::new();
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (u, v, w) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(u), Some(v), Some(w)) => (u, v, w),
            _ => {
                return Err(PrizeTreeError::Parse(format!(
                    "malformed network line in {}: \"{}\"",
                    path.display(),
                    line
                )))
            }
        };
        let weight: f64 = w.parse().map_err(|_| {
            PrizeTreeError::Parse(format!(
                "invalid edge weight in {}: \"{}\"",
                path.display(),
                w
            ))
        })?;
        if upper {
            graph.add_edge(u.to_uppercase(), v.to_uppercase(), weight);
        } else {
            graph.add_edge(u, v, weight);
        }
    }

    debug!(
        "Network has {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Reads node prize data from whitespace-separated `<node> <prize>` lines.
pub fn read_prizes(path: &Path, upper: bool) -> Result<HashMap<String, f64>> {
    debug!("Prizes read from {}", path.display());

    let mut prizes = HashMap::new();
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (node, value) = match (tokens.next(), tokens.next()) {
            (Some(n), Some(v)) => (n, v),
            _ => {
                return Err(PrizeTreeError::Parse(format!(
                    "malformed prize line in {}: \"{}\"",
                    path.display(),
                    line
                )))
            }
        };
        let prize: f64 = value.parse().map_err(|_| {
            PrizeTreeError::Parse(format!("invalid prize in {}: \"{}\"", path.display(), value))
        })?;
        let node = if upper {
            node.to_uppercase()
        } else {
            node.to_string()
        };
        prizes.insert(node, prize);
    }
    Ok(prizes)
}

#[derive(Debug, Deserialize)]
struct NodeSetFile {
    nodes: Vec<String>,
}

/// Reads a constraint node set from a JSON object with a `nodes` array.
pub fn read_node_set_json(path: &Path) -> Result<HashSet<String>> {
    let file = File::open(path)?;
    let data: NodeSetFile = serde_json::from_reader(BufReader::new(file))?;
    Ok(data.nodes.into_iter().collect())
}

/// Reads a constraint node set from whitespace-delimited text.
pub fn read_node_set_txt(path: &Path) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Writes `key<TAB>value` lines, creating parent directories as needed.
pub fn write_tab_dict<'a, I>(path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for (key, value) in entries {
        writeln!(writer, "{}\t{}", key, fmt_float(*value))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a result tree as plain tab-delimited `<u>\t<v>` lines, no weights.
pub fn write_edgelist(path: &Path, tree: &ResultTree) -> Result<()> {
    debug!("Saving to {}", path.display());
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for (u, v) in tree.edges() {
        writeln!(writer, "{}\t{}", u, v)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a tab-delimited edge list back into a result tree.
pub fn read_edgelist(path: &Path) -> Result<ResultTree> {
    let mut tree = ResultTree::default();
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace();
        if let (Some(u), Some(v)) = (tokens.next(), tokens.next()) {
            tree.add_edge(u, v);
        }
    }
    Ok(tree)
}

/// Serializes a value as JSON with 4-space indentation, creating parent
/// directories as needed. Key ordering follows the struct's field order.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    debug!("Saving to {}", path.display());
    ensure_parent(path)?;
    let file = File::create(path)?;
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(BufWriter::new(file), formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn fmt_float_keeps_trailing_zero_for_integral_values() {
        assert_eq!(fmt_float(2.0), "2.0");
        assert_eq!(fmt_float(0.5), "0.5");
        assert_eq!(fmt_float(-0.25), "-0.25");
    }

    #[test]
    fn network_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.wnetwork");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "A B 0.5").unwrap();
        writeln!(f, "B C 0.9").unwrap();

        let g = read_network(&path, false).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn network_rejects_bad_weight() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.wnetwork");
        std::fs::write(&path, "A B heavy\n").unwrap();
        assert!(read_network(&path, false).is_err());
    }

    #[test]
    fn prizes_with_upper_casing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prizes.txt");
        std::fs::write(&path, "chd8 1.5\nscn2a 0.4\n").unwrap();

        let prizes = read_prizes(&path, true).unwrap();
        assert_eq!(prizes["CHD8"], 1.5);
        assert_eq!(prizes["SCN2A"], 0.4);
    }

    #[test]
    fn node_set_from_json_and_txt() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("set.json");
        std::fs::write(&json_path, r#"{"nodes": ["A", "B"]}"#).unwrap();
        let txt_path = dir.path().join("set.txt");
        std::fs::write(&txt_path, "B C\nD").unwrap();

        let a = read_node_set_json(&json_path).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.contains("A"));

        let b = read_node_set_txt(&txt_path).unwrap();
        assert_eq!(b.len(), 3);
        assert!(b.contains("D"));
    }

    #[test]
    fn tab_dict_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deep/prizes.txt");
        let entries = vec![("A".to_string(), 1.0), ("B".to_string(), -0.25)];
        write_tab_dict(&path, entries.iter().map(|(k, v)| (k, v))).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "A\t1.0\nB\t-0.25\n");
    }

    #[test]
    fn edgelist_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.txt");
        let tree = ResultTree::from_edges(vec![("A", "B"), ("B", "C")]);
        write_edgelist(&path, &tree).unwrap();

        let back = read_edgelist(&path).unwrap();
        assert_eq!(back, tree);
    }
}
