use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use prizetree_core::{PrizeTreeError, Result, Settings};
use prizetree_pipeline::{RunRequest, SteinerPipeline};
use prizetree_solver::SteinerOracle;

use crate::score::{cluster_nodes, overlap_score, read_ground_truth};

/// One network participating in the calibration, with its starting
/// parameter values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub network_file: PathBuf,
    #[serde(default = "NetworkSpec::default_initial_beta")]
    pub initial_beta: f64,
    #[serde(default = "NetworkSpec::default_initial_lambda")]
    pub initial_lambda: f64,
}

impl NetworkSpec {
    fn default_initial_beta() -> f64 {
        1.0
    }

    fn default_initial_lambda() -> f64 {
        0.1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub ground_truth_file: PathBuf,
    pub networks: Vec<NetworkSpec>,
    /// Phase-2 cohorts as index lists into `networks`; every cohort is
    /// searched to completion before the next one starts. Empty means one
    /// cohort holding every network.
    #[serde(default)]
    pub cohorts: Vec<Vec<usize>>,
    /// Added to beta after each accepted phase-1 trial, subtracted back on
    /// the first regression. May be negative.
    #[serde(default = "CalibrationConfig::default_beta_step")]
    pub beta_step: f64,
    /// Lambda is divided by this after each accepted phase-2 trial and
    /// multiplied back on the first regression.
    #[serde(default = "CalibrationConfig::default_lambda_divisor")]
    pub lambda_divisor: f64,
    /// File that accumulates the accepted cluster paths; phase-2 solves
    /// read it as their constraint list.
    pub cluster_list_file: PathBuf,
    #[serde(default = "CalibrationConfig::default_betas_file")]
    pub betas_file: PathBuf,
    #[serde(default = "CalibrationConfig::default_lambdas_file")]
    pub lambdas_file: PathBuf,
    /// Safety cap on the total number of solves across both phases.
    /// `None` preserves the unbounded behavior and is the default.
    #[serde(default)]
    pub max_rounds: Option<u64>,
}

impl CalibrationConfig {
    fn default_beta_step() -> f64 {
        -0.02
    }

    fn default_lambda_divisor() -> f64 {
        2.0
    }

    fn default_betas_file() -> PathBuf {
        "betas.txt".into()
    }

    fn default_lambdas_file() -> PathBuf {
        "lambdas.txt".into()
    }

    fn cohort_indices(&self) -> Vec<Vec<usize>> {
        if self.cohorts.is_empty() {
            vec![(0..self.networks.len()).collect()]
        } else {
            self.cohorts.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            return Err(PrizeTreeError::Calibration(
                "calibration requires at least one network".to_string(),
            ));
        }
        for cohort in &self.cohorts {
            for &idx in cohort {
                if idx >= self.networks.len() {
                    return Err(PrizeTreeError::Calibration(format!(
                        "cohort references network index {} out of {}",
                        idx,
                        self.networks.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// Every network regressed once and rolled back.
    Converged,
    /// The configured round cap was hit; accepted clusters are kept.
    CapReached,
}

#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub betas: Vec<f64>,
    pub lambdas: Vec<f64>,
    pub termination: TerminationReason,
}

/// The single solve the search repeats. Implemented by the real pipeline
/// and by scripted stubs in tests.
pub trait TrialRunner {
    /// Runs one solve and returns the path of the cluster edge list
    /// written for `exp_id`.
    fn run_trial(
        &mut self,
        network: &NetworkSpec,
        beta: f64,
        lambda: f64,
        exp_id: &str,
        cluster_list_file: Option<&Path>,
    ) -> Result<PathBuf>;
}

/// Trial runner backed by the real Steiner pipeline.
pub struct PipelineTrialRunner<O: SteinerOracle> {
    pipeline: SteinerPipeline<O>,
    settings: Settings,
    prize_file: PathBuf,
}

impl<O: SteinerOracle> PipelineTrialRunner<O> {
    pub fn new(oracle: O, settings: Settings, prize_file: impl Into<PathBuf>) -> Self {
        let pipeline = SteinerPipeline::new(oracle, settings.paths.clone());
        Self {
            pipeline,
            settings,
            prize_file: prize_file.into(),
        }
    }
}

impl<O: SteinerOracle> TrialRunner for PipelineTrialRunner<O> {
    fn run_trial(
        &mut self,
        network: &NetworkSpec,
        beta: f64,
        lambda: f64,
        exp_id: &str,
        cluster_list_file: Option<&Path>,
    ) -> Result<PathBuf> {
        let mut request =
            RunRequest::from_settings(&self.settings, &network.network_file, &self.prize_file);
        request.beta = beta;
        request.lambda = lambda;
        request.exp_id = Some(exp_id.to_string());
        request.cluster_list_file = cluster_list_file.map(Path::to_path_buf);
        let output = self.pipeline.run(&request)?;
        Ok(output.paths.result_details_file)
    }
}

/// Two-phase greedy local search over beta then lambda, scored against a
/// ground-truth gene list, with rollback on the first regression per
/// network.
pub struct HyperparameterSearch<'a, R: TrialRunner> {
    runner: &'a mut R,
    config: &'a CalibrationConfig,
    ground_truth: HashSet<String>,
    rounds: u64,
}

impl<'a, R: TrialRunner> HyperparameterSearch<'a, R> {
    pub fn new(runner: &'a mut R, config: &'a CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let ground_truth = read_ground_truth(&config.ground_truth_file)?;
        Ok(Self {
            runner,
            config,
            ground_truth,
            rounds: 0,
        })
    }

    pub fn run(&mut self) -> Result<CalibrationOutcome> {
        let mut betas: Vec<f64> = self
            .config
            .networks
            .iter()
            .map(|n| n.initial_beta)
            .collect();
        let mut lambdas: Vec<f64> = self
            .config
            .networks
            .iter()
            .map(|n| n.initial_lambda)
            .collect();

        info!("Phase 1: beta search, lambda fixed at 0");
        if !self.search_betas(&mut betas)? {
            return self.capped(betas, lambdas);
        }

        info!("Phase 2: lambda search, beta fixed at phase-1 result");
        if !self.search_lambdas(&betas, &mut lambdas)? {
            return self.capped(betas, lambdas);
        }

        write_values(&self.config.betas_file, &betas)?;
        write_values(&self.config.lambdas_file, &lambdas)?;

        Ok(CalibrationOutcome {
            betas,
            lambdas,
            termination: TerminationReason::Converged,
        })
    }

    fn capped(&self, betas: Vec<f64>, lambdas: Vec<f64>) -> Result<CalibrationOutcome> {
        warn!(
            "Round cap of {} reached before convergence",
            self.config.max_rounds.unwrap_or(0)
        );
        write_values(&self.config.betas_file, &betas)?;
        write_values(&self.config.lambdas_file, &lambdas)?;
        Ok(CalibrationOutcome {
            betas,
            lambdas,
            termination: TerminationReason::CapReached,
        })
    }

    /// Per-network monotone hill climb: keep advancing beta while the
    /// overlap does not decrease; the first regression discards that trial
    /// and steps beta back one increment. Returns false when the round cap
    /// fires first.
    fn search_betas(&mut self, betas: &mut [f64]) -> Result<bool> {
        for (idx, network) in self.config.networks.iter().enumerate() {
            let temp_id = format!("temp_cluster_{}", network.name);
            let mut prev_score = 0.0;
            let mut accepted_once = false;

            loop {
                if !self.take_round() {
                    return Ok(false);
                }
                let trial_path =
                    self.runner
                        .run_trial(network, betas[idx], 0.0, &temp_id, None)?;
                let nodes = cluster_nodes(&trial_path)?;
                let score = overlap_score(&self.ground_truth, &nodes);
                debug!(
                    "{}: beta {} scored {:.4} (prev {:.4})",
                    network.name, betas[idx], score, prev_score
                );

                if score < prev_score {
                    betas[idx] -= self.config.beta_step;
                    remove_file_quiet(&trial_path);
                    info!("{}: beta settled at {}", network.name, betas[idx]);
                    break;
                }

                betas[idx] += self.config.beta_step;
                let accepted = self.promote(&trial_path, &network.name)?;
                if !accepted_once {
                    append_line(&self.config.cluster_list_file, &accepted)?;
                    accepted_once = true;
                }
                prev_score = score;
            }
        }
        Ok(true)
    }

    /// Round-robin lambda search within each cohort. Later networks in a
    /// cohort are constrained by the accepted clusters of earlier ones
    /// through the cluster-list file.
    fn search_lambdas(&mut self, betas: &[f64], lambdas: &mut [f64]) -> Result<bool> {
        for cohort in self.config.cohort_indices() {
            let mut done = vec![false; cohort.len()];
            let mut prev_scores = vec![0.0; cohort.len()];
            let mut i = 0usize;

            while done.iter().any(|d| !d) {
                let pos = i % cohort.len();
                i += 1;
                if done[pos] {
                    continue;
                }
                if !self.take_round() {
                    return Ok(false);
                }

                let net_idx = cohort[pos];
                let network = &self.config.networks[net_idx];
                let temp_id = format!("temp_cluster_{}", network.name);
                let trial_path = self.runner.run_trial(
                    network,
                    betas[net_idx],
                    lambdas[net_idx],
                    &temp_id,
                    Some(&self.config.cluster_list_file),
                )?;
                let nodes = cluster_nodes(&trial_path)?;
                let score = overlap_score(&self.ground_truth, &nodes);
                debug!(
                    "{}: lambda {} scored {:.4} (prev {:.4})",
                    network.name, lambdas[net_idx], score, prev_scores[pos]
                );

                if score < prev_scores[pos] {
                    lambdas[net_idx] *= self.config.lambda_divisor;
                    remove_file_quiet(&trial_path);
                    done[pos] = true;
                    info!("{}: lambda settled at {}", network.name, lambdas[net_idx]);
                } else {
                    lambdas[net_idx] /= self.config.lambda_divisor;
                    self.promote(&trial_path, &network.name)?;
                    prev_scores[pos] = score;
                }
            }
        }
        Ok(true)
    }

    /// Consumes one round from the cap; false means the cap is spent.
    fn take_round(&mut self) -> bool {
        if let Some(cap) = self.config.max_rounds {
            if self.rounds >= cap {
                return false;
            }
        }
        self.rounds += 1;
        true
    }

    /// Replaces the accepted cluster of a network with the trial result.
    /// The accepted file keeps a stable name, independent of the discarded
    /// temporary trial name, so later phases can read it as a constraint.
    fn promote(&self, trial_path: &Path, name: &str) -> Result<PathBuf> {
        let accepted = trial_path.with_file_name(format!("cluster_{}.txt", name));
        if accepted.exists() {
            remove_file_quiet(&accepted);
        }
        fs::rename(trial_path, &accepted)?;
        Ok(accepted)
    }
}

fn append_line(path: &Path, entry: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", entry.display())?;
    Ok(())
}

fn write_values(path: &Path, values: &[f64]) -> Result<()> {
    let mut out = String::new();
    for value in values {
        out.push_str(&format!("{}\n", value));
    }
    fs::write(path, out)?;
    Ok(())
}

fn remove_file_quiet(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("Skipping removal of {}: {}", path.display(), e);
    }
}
