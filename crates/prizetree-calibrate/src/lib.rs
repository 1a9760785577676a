pub mod score;
pub mod search;

pub use score::{cluster_nodes, overlap_score, read_ground_truth};
pub use search::{
    CalibrationConfig, CalibrationOutcome, HyperparameterSearch, NetworkSpec, PipelineTrialRunner,
    TerminationReason, TrialRunner,
};
