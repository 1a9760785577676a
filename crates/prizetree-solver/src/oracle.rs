use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use prizetree_core::Result;
use prizetree_graph::ResultTree;

use crate::exec::{self, SolverParams};
use crate::parse;
use crate::protocol::SolverInput;

/// Metadata of one solver run, persisted under the `log` key of the result
/// document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLog {
    pub args: Vec<String>,
    pub error: Vec<String>,
    pub output: Vec<String>,
    pub root: String,
    pub terminals: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub tree: ResultTree,
    pub log: RunLog,
}

/// The external combinatorial solver as a black-box oracle. The pipeline
/// only depends on this seam, so tests can substitute a stub.
pub trait SteinerOracle {
    fn solve(&self, input: &SolverInput, stp_file: &Path) -> Result<SolverOutcome>;
}

/// Oracle backed by a message-passing Steiner solver binary.
#[derive(Debug, Clone)]
pub struct MsgSteiner {
    pub binary: PathBuf,
    pub params: SolverParams,
}

impl MsgSteiner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            params: SolverParams::default(),
        }
    }

    pub fn with_params(mut self, params: SolverParams) -> Self {
        self.params = params;
        self
    }
}

impl SteinerOracle for MsgSteiner {
    fn solve(&self, input: &SolverInput, stp_file: &Path) -> Result<SolverOutcome> {
        debug!("Writing solver input file to {}", stp_file.display());
        input.write_to(stp_file)?;

        debug!("Executing solver binary at {}", self.binary.display());
        let invocation = exec::execute(&self.binary, stp_file, &self.params)?;

        let root = parse::parse_root(&invocation.stderr);
        debug!("Root: {}", root);

        let edges = parse::parse_tree_edges(&invocation.stdout);
        let tree = ResultTree::from_edges(edges);
        debug!(
            "Tree found, {} nodes, {} edges",
            tree.node_count(),
            tree.edge_count()
        );

        Ok(SolverOutcome {
            tree,
            log: RunLog {
                args: invocation.args,
                error: invocation.stderr,
                output: invocation.stdout,
                root,
                terminals: input.terminals.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct StubOracle {
        edges: Vec<(String, String)>,
    }

    impl SteinerOracle for StubOracle {
        fn solve(&self, input: &SolverInput, stp_file: &Path) -> Result<SolverOutcome> {
            input.write_to(stp_file)?;
            let tree = ResultTree::from_edges(self.edges.clone());
            Ok(SolverOutcome {
                tree,
                log: RunLog {
                    root: parse::ROOT_NOT_AVAILABLE.to_string(),
                    terminals: input.terminals.clone(),
                    ..RunLog::default()
                },
            })
        }
    }

    #[test]
    fn stub_oracle_satisfies_the_seam() {
        let oracle = StubOracle {
            edges: vec![("A".to_string(), "B".to_string())],
        };
        let dir = tempdir().unwrap();
        let stp = dir.path().join("input.stp");
        let input = SolverInput::default().with_terminals(vec!["A".to_string()]);

        let outcome = oracle.solve(&input, &stp).unwrap();
        assert_eq!(outcome.tree.edge_count(), 1);
        assert_eq!(outcome.log.terminals, vec!["A"]);
        assert!(stp.exists());
    }

    #[cfg(unix)]
    #[test]
    fn msgsteiner_parses_tree_and_root() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let script = dir.path().join("fake_solver.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             cat - > /dev/null\n\
             echo 'A B 0.5'\n\
             echo 'B C 0.9'\n\
             echo 'converged'\n\
             echo 'root: B' >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut graph = prizetree_graph::WeightedGraph::new();
        graph.add_edge("A", "B", 0.5);
        graph.add_edge("B", "C", 0.9);
        for (_, attrs) in graph.edges_mut() {
            attrs.cost = Some(attrs.weight);
        }

        let oracle = MsgSteiner::new(&script);
        let stp = dir.path().join("input.stp");
        let input = SolverInput::from_graph(&graph);
        let outcome = oracle.solve(&input, &stp).unwrap();

        assert_eq!(outcome.tree.node_count(), 3);
        assert_eq!(outcome.tree.edge_count(), 2);
        assert_eq!(outcome.log.root, "B");
    }
}
