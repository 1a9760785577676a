pub mod pipeline;
pub mod run;

pub use pipeline::{RunOutput, RunRequest, SteinerPipeline};
pub use run::{
    exp_date, generate_exp_id, ConstraintSetRecord, FileRecord, ResultMetadata, RunPaths,
};
