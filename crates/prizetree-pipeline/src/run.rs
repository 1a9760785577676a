use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prizetree_core::PathsConfig;
use prizetree_solver::RunLog;

/// Today's date in the `<YYYYMMDD>` form used by experiment ids and the
/// metadata document.
pub fn exp_date() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

/// Generates an experiment id in the form `<date>_<5-hex-random>`.
pub fn generate_exp_id(exp_date: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(5).collect();
    format!("{}_{}", exp_date, suffix)
}

/// All files derived from one experiment id. Every run's outputs are fully
/// namespaced by its id, so a failed run never touches another run's files.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Solver input, `stp_dir/<exp_id>.stp`.
    pub stp_file: PathBuf,
    /// Metadata document, `stp_dir/<exp_id>.json`.
    pub result_file: PathBuf,
    /// Final edge list, `cluster_dir/<exp_id>.txt`.
    pub result_details_file: PathBuf,
    /// Run log, `log_dir/<exp_id>.log`.
    pub log_file: PathBuf,
    /// Artificial-prize dump, `art_prizes_dir/<exp_id>.txt`; none when no
    /// dump directory is configured.
    pub art_prizes_file: Option<PathBuf>,
}

impl RunPaths {
    pub fn derive(paths: &PathsConfig, exp_id: &str) -> Self {
        Self {
            stp_file: paths.stp_dir.join(format!("{}.stp", exp_id)),
            result_file: paths.stp_dir.join(format!("{}.json", exp_id)),
            result_details_file: paths.cluster_dir.join(format!("{}.txt", exp_id)),
            log_file: paths.log_dir.join(format!("{}.log", exp_id)),
            art_prizes_file: paths
                .art_prizes_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}.txt", exp_id))),
        }
    }
}

/// One constraint set as recorded in the metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSetRecord {
    pub nodes: Vec<String>,
}

/// Input/output filenames of the run, by role.
// Fields are declared in key order so the persisted JSON has sorted keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub log: String,
    pub network: String,
    pub prize: String,
    pub result: String,
    pub stp: String,
}

impl FileRecord {
    pub fn new(run_paths: &RunPaths, network_file: &Path, prize_file: &Path) -> Self {
        Self {
            log: file_name(&run_paths.log_file),
            network: file_name(network_file),
            prize: file_name(prize_file),
            result: file_name(&run_paths.result_file),
            stp: file_name(&run_paths.stp_file),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The metadata document persisted next to the solver input, one per run.
// Fields are declared in key order so the persisted JSON has sorted keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub alpha: f64,
    pub beta: f64,
    pub const_results: Vec<ConstraintSetRecord>,
    pub edges: Vec<(String, String)>,
    pub exp_date: String,
    pub exp_id: String,
    pub files: FileRecord,
    pub lambda: f64,
    pub log: RunLog,
    pub log_name: String,
    pub name: String,
    pub nodes: Vec<String>,
    pub prize_mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_id_has_date_prefix_and_hex_suffix() {
        let date = exp_date();
        let id = generate_exp_id(&date);
        let (prefix, suffix) = id.split_once('_').unwrap();
        assert_eq!(prefix, date);
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn derived_paths_are_namespaced_by_exp_id() {
        let paths = PathsConfig {
            art_prizes_dir: Some("art".into()),
            ..PathsConfig::default()
        };
        let run_paths = RunPaths::derive(&paths, "20260807_ab12f");
        assert_eq!(run_paths.stp_file, Path::new("inputs/20260807_ab12f.stp"));
        assert_eq!(run_paths.result_file, Path::new("inputs/20260807_ab12f.json"));
        assert_eq!(
            run_paths.result_details_file,
            Path::new("results/20260807_ab12f.txt")
        );
        assert_eq!(run_paths.log_file, Path::new("logs/20260807_ab12f.log"));
        assert_eq!(
            run_paths.art_prizes_file.as_deref(),
            Some(Path::new("art/20260807_ab12f.txt"))
        );
    }
}
