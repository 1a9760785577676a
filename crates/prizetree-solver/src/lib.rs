pub mod exec;
pub mod oracle;
pub mod parse;
pub mod protocol;

pub use exec::{SolverInvocation, SolverParams};
pub use oracle::{MsgSteiner, RunLog, SolverOutcome, SteinerOracle};
pub use parse::{parse_root, parse_tree_edges, ROOT_NOT_AVAILABLE};
pub use protocol::SolverInput;
