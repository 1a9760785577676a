pub mod config;
pub mod error;
pub mod types;

pub use config::{ParametersConfig, PathsConfig, Settings, SolverConfig, SteinerConfig};
pub use error::{PrizeTreeError, Result};
pub use types::{CostMode, NodeId, Polarity, PrizeMode};
