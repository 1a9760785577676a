use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use prizetree_core::Result;
use prizetree_graph::io::fmt_float;
use prizetree_graph::WeightedGraph;

/// The prized, costed problem instance handed to the external solver.
///
/// The solver reads a flat line-oriented text document in fixed section
/// order, each section preceded by a comment line:
///
/// ```text
/// # undirected edges
/// E <u> <v> <cost>
/// # directed edges
/// D <u> <v> <cost>
/// # node prizes
/// W <node> <prize>
/// # terminals
/// T <node>
/// # root            (only if a root is forced)
/// R <node>
/// ```
#[derive(Debug, Clone, Default)]
pub struct SolverInput {
    pub undirected: Vec<(String, String, f64)>,
    pub directed: Vec<(String, String, f64)>,
    pub prizes: Vec<(String, f64)>,
    pub terminals: Vec<String>,
    pub root: Option<String>,
}

impl SolverInput {
    /// Builds an input from the computed edge costs and constrained prizes
    /// of a network.
    pub fn from_graph(graph: &WeightedGraph) -> Self {
        let undirected = graph
            .edge_costs()
            .into_iter()
            .map(|(key, cost)| {
                let (u, v) = key.endpoints();
                (u.to_string(), v.to_string(), cost)
            })
            .collect();
        let prizes = graph.const_prizes().into_iter().collect();
        Self {
            undirected,
            directed: Vec::new(),
            prizes,
            terminals: Vec::new(),
            root: None,
        }
    }

    pub fn with_terminals(mut self, terminals: Vec<String>) -> Self {
        self.terminals = terminals;
        self
    }

    pub fn with_root(mut self, root: Option<String>) -> Self {
        self.root = root;
        self
    }

    /// Writes the solver input document, creating parent directories as
    /// needed. Self-loops are never written, even if present in the edge
    /// lists.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);

        writeln!(writer, "# undirected edges")?;
        for (u, v, cost) in &self.undirected {
            if u != v {
                writeln!(writer, "E {} {} {}", u, v, fmt_float(*cost))?;
            }
        }

        writeln!(writer, "# directed edges")?;
        for (u, v, cost) in &self.directed {
            if u != v {
                writeln!(writer, "D {} {} {}", u, v, fmt_float(*cost))?;
            }
        }

        writeln!(writer, "# node prizes")?;
        for (node, prize) in &self.prizes {
            writeln!(writer, "W {} {}", node, fmt_float(*prize))?;
        }

        writeln!(writer, "# terminals")?;
        for terminal in &self.terminals {
            writeln!(writer, "T {}", terminal)?;
        }

        if let Some(root) = &self.root {
            writeln!(writer, "# root")?;
            writeln!(writer, "R {}", root)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sections_in_fixed_order() {
        let input = SolverInput {
            undirected: vec![("A".into(), "B".into(), 0.5)],
            directed: vec![("B".into(), "C".into(), 0.9)],
            prizes: vec![("A".into(), 2.0), ("C".into(), 4.0)],
            terminals: vec!["C".into()],
            root: Some("A".into()),
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("input.stp");
        input.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let expected = "# undirected edges\n\
                        E A B 0.5\n\
                        # directed edges\n\
                        D B C 0.9\n\
                        # node prizes\n\
                        W A 2.0\n\
                        W C 4.0\n\
                        # terminals\n\
                        T C\n\
                        # root\n\
                        R A\n";
        assert_eq!(content, expected);
    }

    #[test]
    fn self_loops_are_omitted() {
        let input = SolverInput {
            undirected: vec![("a".into(), "a".into(), 5.0), ("a".into(), "b".into(), 1.0)],
            ..Default::default()
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("input.stp");
        input.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("E a a"));
        assert!(content.contains("E a b 1.0"));
    }

    #[test]
    fn root_section_absent_when_not_forced() {
        let input = SolverInput::default();
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.stp");
        input.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("# root"));
        assert!(!content.contains("\nR "));
    }

    #[test]
    fn from_graph_uses_costs_and_const_prizes() {
        let mut g = WeightedGraph::new();
        g.add_edge("A", "B", 0.5);
        for (_, attrs) in g.edges_mut() {
            attrs.cost = Some(0.75);
        }
        g.node_mut("A").unwrap().const_prize = Some(2.0);
        g.node_mut("A").unwrap().prize = Some(1.0);

        let input = SolverInput::from_graph(&g);
        assert_eq!(input.undirected, vec![("A".into(), "B".into(), 0.75)]);
        assert_eq!(input.prizes, vec![("A".into(), 2.0)]);
    }
}
