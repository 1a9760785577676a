use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrizeTreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Calibration error: {0}")]
    Calibration(String),
}

pub type Result<T> = std::result::Result<T, PrizeTreeError>;
