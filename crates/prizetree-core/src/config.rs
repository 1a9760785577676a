use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrizeTreeError, Result};
use crate::types::{CostMode, PrizeMode};

/// Role-specific output directories. All derived filenames are
/// `<exp_id>.<ext>` under these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "PathsConfig::default_stp_dir")]
    pub stp_dir: PathBuf,
    #[serde(default = "PathsConfig::default_cluster_dir")]
    pub cluster_dir: PathBuf,
    #[serde(default = "PathsConfig::default_log_dir")]
    pub log_dir: PathBuf,
    /// Where the artificial-prize dump for each run lands; no dump is
    /// written when unset.
    #[serde(default)]
    pub art_prizes_dir: Option<PathBuf>,
    /// File listing paths to constraint node-set files, one per line.
    #[serde(default)]
    pub cluster_list_file: Option<PathBuf>,
}

impl PathsConfig {
    fn default_stp_dir() -> PathBuf {
        "inputs".into()
    }

    fn default_cluster_dir() -> PathBuf {
        "results".into()
    }

    fn default_log_dir() -> PathBuf {
        "logs".into()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stp_dir: Self::default_stp_dir(),
            cluster_dir: Self::default_cluster_dir(),
            log_dir: Self::default_log_dir(),
            art_prizes_dir: None,
            cluster_list_file: None,
        }
    }
}

/// Trade-off hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersConfig {
    /// Scales base prizes against edge costs.
    #[serde(default = "ParametersConfig::default_beta")]
    pub beta: f64,
    /// Scales the magnitude of artificial prizes.
    #[serde(default)]
    pub lambda: f64,
    /// Exponent of the frequency-to-prize mapping.
    #[serde(default = "ParametersConfig::default_alpha")]
    pub alpha: f64,
}

impl ParametersConfig {
    fn default_beta() -> f64 {
        1.0
    }

    fn default_alpha() -> f64 {
        2.0
    }
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            beta: Self::default_beta(),
            lambda: 0.0,
            alpha: Self::default_alpha(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteinerConfig {
    #[serde(default)]
    pub prize_mode: PrizeMode,
    #[serde(default)]
    pub cost_mode: CostMode,
    /// Keep the solver input file and the metadata JSON after a run.
    #[serde(default = "SteinerConfig::default_retain_intermediate")]
    pub retain_intermediate: bool,
    #[serde(default = "SteinerConfig::default_log_name")]
    pub log_name: String,
    /// Upper-case node identifiers while loading prizes and networks.
    #[serde(default)]
    pub upper_case_ids: bool,
}

impl SteinerConfig {
    fn default_retain_intermediate() -> bool {
        true
    }

    fn default_log_name() -> String {
        "prizetree".to_string()
    }
}

impl Default for SteinerConfig {
    fn default() -> Self {
        Self {
            prize_mode: PrizeMode::default(),
            cost_mode: CostMode::default(),
            retain_intermediate: Self::default_retain_intermediate(),
            log_name: Self::default_log_name(),
            upper_case_ids: false,
        }
    }
}

/// Tuning knobs for the external message-passing solver. Every `None`
/// omits the corresponding flag from the argument vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default = "SolverConfig::default_depth")]
    pub depth: Option<u32>,
    #[serde(default)]
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default = "SolverConfig::default_noise")]
    pub noise: Option<f64>,
    #[serde(default = "SolverConfig::default_reinforcement")]
    pub reinforcement: Option<f64>,
    #[serde(default)]
    pub decision_repeats: Option<u32>,
    #[serde(default)]
    pub terminal_prize: Option<f64>,
}

impl SolverConfig {
    fn default_depth() -> Option<u32> {
        Some(30)
    }

    fn default_noise() -> Option<f64> {
        Some(0.0)
    }

    fn default_reinforcement() -> Option<f64> {
        Some(1e-3)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            binary: None,
            threads: None,
            depth: Self::default_depth(),
            max_iterations: None,
            tolerance: None,
            noise: Self::default_noise(),
            reinforcement: Self::default_reinforcement(),
            decision_repeats: None,
            terminal_prize: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub steiner: SteinerConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Settings {
    /// Loads settings from an optional TOML file, then applies
    /// `PRIZETREE_*` environment overrides (`__` as section separator).
    /// Unknown cost modes are rejected here, before any file is written.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_file {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PRIZETREE")
                .separator("__")
                .try_parsing(true),
        );
        let settings: Settings = builder
            .build()
            .map_err(|e| PrizeTreeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PrizeTreeError::Config(e.to_string()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.parameters.beta, 1.0);
        assert_eq!(settings.parameters.lambda, 0.0);
        assert_eq!(settings.parameters.alpha, 2.0);
        assert_eq!(settings.steiner.cost_mode, CostMode::Weight);
        assert_eq!(settings.steiner.prize_mode.as_str(), "positive");
        assert!(settings.steiner.retain_intermediate);
        assert_eq!(settings.solver.depth, Some(30));
        assert_eq!(settings.solver.noise, Some(0.0));
        assert_eq!(settings.solver.reinforcement, Some(1e-3));
        assert_eq!(settings.solver.threads, None);
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[parameters]
beta = 2.5
lambda = 0.1

[steiner]
prize_mode = "negative-proportional"
cost_mode = "1-weightsqd"
retain_intermediate = false

[solver]
binary = "/opt/msgsteiner/msgsteiner"
threads = 4
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.parameters.beta, 2.5);
        assert_eq!(settings.parameters.lambda, 0.1);
        assert!(settings.steiner.prize_mode.negative);
        assert!(settings.steiner.prize_mode.proportional);
        assert_eq!(settings.steiner.cost_mode, CostMode::OneMinusWeightSquared);
        assert!(!settings.steiner.retain_intermediate);
        assert_eq!(settings.solver.threads, Some(4));
    }

    #[test]
    fn unknown_cost_mode_is_a_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[steiner]\ncost_mode = \"squared\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
