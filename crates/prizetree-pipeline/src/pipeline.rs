use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use prizetree_core::{CostMode, PrizeMode, Result, Settings};
use prizetree_graph::{
    compute_edge_costs, constrain_prizes, io, resolve_node_prizes, scale_node_prizes, ResultTree,
};
use prizetree_solver::{SolverInput, SteinerOracle};

use crate::run::{exp_date, generate_exp_id, ConstraintSetRecord, FileRecord, ResultMetadata, RunPaths};

/// Everything one run needs besides the output directory layout.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub network_file: PathBuf,
    pub prize_file: PathBuf,
    pub cluster_list_file: Option<PathBuf>,
    pub beta: f64,
    pub lambda: f64,
    pub alpha: f64,
    pub prize_mode: PrizeMode,
    pub cost_mode: CostMode,
    /// Caller-supplied experiment id; generated as `<date>_<5-hex>` when
    /// absent.
    pub exp_id: Option<String>,
    pub retain_intermediate: bool,
    pub log_name: String,
    pub upper_case_ids: bool,
}

impl RunRequest {
    pub fn from_settings(
        settings: &Settings,
        network_file: impl Into<PathBuf>,
        prize_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            network_file: network_file.into(),
            prize_file: prize_file.into(),
            cluster_list_file: settings.paths.cluster_list_file.clone(),
            beta: settings.parameters.beta,
            lambda: settings.parameters.lambda,
            alpha: settings.parameters.alpha,
            prize_mode: settings.steiner.prize_mode.clone(),
            cost_mode: settings.steiner.cost_mode,
            exp_id: None,
            retain_intermediate: settings.steiner.retain_intermediate,
            log_name: settings.steiner.log_name.clone(),
            upper_case_ids: settings.steiner.upper_case_ids,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub tree: ResultTree,
    pub metadata: ResultMetadata,
    pub paths: RunPaths,
}

/// Sequences one run: directories, inputs, cost transform, prize
/// resolution, scaling, constraining, solve, result persistence, optional
/// intermediate cleanup. Owns the run's identity and file lifecycle.
pub struct SteinerPipeline<O: SteinerOracle> {
    oracle: O,
    paths: prizetree_core::PathsConfig,
}

impl<O: SteinerOracle> SteinerPipeline<O> {
    pub fn new(oracle: O, paths: prizetree_core::PathsConfig) -> Self {
        Self { oracle, paths }
    }

    pub fn run(&self, request: &RunRequest) -> Result<RunOutput> {
        let exp_date = exp_date();
        let exp_id = request
            .exp_id
            .clone()
            .unwrap_or_else(|| generate_exp_id(&exp_date));
        debug!("Running {} with ID {}", request.log_name, exp_id);

        self.ensure_directories()?;
        let run_paths = RunPaths::derive(&self.paths, &exp_id);

        let (const_sets, const_results) =
            load_constraint_sets(request.cluster_list_file.as_deref())?;

        let prizes = io::read_prizes(&request.prize_file, request.upper_case_ids)?;
        let mut network = io::read_network(&request.network_file, request.upper_case_ids)?;

        compute_edge_costs(&mut network, request.cost_mode);
        resolve_node_prizes(&mut network, &prizes);
        scale_node_prizes(&mut network, request.beta);
        constrain_prizes(
            &mut network,
            &const_sets,
            request.lambda,
            request.alpha,
            &request.prize_mode,
            run_paths.art_prizes_file.as_deref(),
        )?;

        let input = SolverInput::from_graph(&network);
        let outcome = self.oracle.solve(&input, &run_paths.stp_file)?;

        let metadata = ResultMetadata {
            alpha: request.alpha,
            beta: request.beta,
            const_results,
            edges: outcome
                .tree
                .edges()
                .map(|(u, v)| (u.to_string(), v.to_string()))
                .collect(),
            exp_date,
            exp_id: exp_id.clone(),
            files: FileRecord::new(&run_paths, &request.network_file, &request.prize_file),
            lambda: request.lambda,
            log: outcome.log,
            log_name: request.log_name.clone(),
            name: request
                .network_file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            nodes: outcome.tree.nodes().cloned().collect(),
            prize_mode: request.prize_mode.as_str().to_string(),
        };
        io::write_json_pretty(&run_paths.result_file, &metadata)?;
        io::write_edgelist(&run_paths.result_details_file, &outcome.tree)?;

        if !request.retain_intermediate {
            cleanup_intermediate(&run_paths);
        }
        debug!("{} with ID {} completed", request.log_name, exp_id);

        Ok(RunOutput {
            tree: outcome.tree,
            metadata,
            paths: run_paths,
        })
    }

    fn ensure_directories(&self) -> Result<()> {
        let mut dirs = vec![&self.paths.stp_dir, &self.paths.cluster_dir, &self.paths.log_dir];
        if let Some(art_dir) = &self.paths.art_prizes_dir {
            dirs.push(art_dir);
        }
        for dir in dirs {
            if !dir.exists() {
                debug!("Creating directory {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Loads the auxiliary constraint node sets named by a cluster-list file.
/// A missing list, a missing entry, or an unrecognized extension is an
/// absence, not an error.
fn load_constraint_sets(
    list_file: Option<&Path>,
) -> Result<(Vec<HashSet<String>>, Vec<ConstraintSetRecord>)> {
    let Some(list_file) = list_file else {
        debug!("No constraint file list is provided");
        return Ok((Vec::new(), Vec::new()));
    };
    if !list_file.exists() {
        debug!("Constraint file list not found at {}", list_file.display());
        return Ok((Vec::new(), Vec::new()));
    }

    let content = fs::read_to_string(list_file)?;
    let files: Vec<PathBuf> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    debug!(
        "Read constraining file list from {}: {} file(s)",
        list_file.display(),
        files.len()
    );

    let mut sets = Vec::new();
    let mut records = Vec::new();
    for file in files {
        if !file.exists() {
            warn!("Constraint file missing, skipping: {}", file.display());
            continue;
        }
        let nodes = match file.extension().and_then(|e| e.to_str()) {
            Some("json") => io::read_node_set_json(&file)?,
            Some("txt") => io::read_node_set_txt(&file)?,
            _ => {
                warn!("Unable to load constraint set from {}", file.display());
                continue;
            }
        };
        debug!(
            "Loaded constraining set from {}: {} nodes",
            file.display(),
            nodes.len()
        );
        let mut listed: Vec<String> = nodes.iter().cloned().collect();
        listed.sort();
        records.push(ConstraintSetRecord { nodes: listed });
        sets.push(nodes);
    }
    Ok((sets, records))
}

/// Removes the solver input file, the metadata JSON and the
/// artificial-prize dump, then their directories when empty. Cleanup is
/// best-effort: anything already gone or still in use is skipped.
fn cleanup_intermediate(run_paths: &RunPaths) {
    remove_file_quiet(&run_paths.stp_file);
    remove_file_quiet(&run_paths.result_file);
    if let Some(parent) = run_paths.stp_file.parent() {
        remove_dir_if_empty(parent);
    }
    if let Some(art_file) = &run_paths.art_prizes_file {
        remove_file_quiet(art_file);
        if let Some(parent) = art_file.parent() {
            remove_dir_if_empty(parent);
        }
    }
    debug!("Intermediate files and folders are removed");
}

fn remove_file_quiet(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("Skipping removal of {}: {}", path.display(), e);
    }
}

fn remove_dir_if_empty(dir: &Path) {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                if let Err(e) = fs::remove_dir(dir) {
                    debug!("Skipping removal of {}: {}", dir.display(), e);
                }
            }
        }
        Err(e) => debug!("Skipping removal of {}: {}", dir.display(), e),
    }
}
