use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

use prizetree_calibrate::{CalibrationConfig, HyperparameterSearch, PipelineTrialRunner, TerminationReason};
use prizetree_core::Settings;
use prizetree_pipeline::{RunRequest, SteinerPipeline};
use prizetree_solver::{MsgSteiner, SolverParams};

#[derive(Parser)]
#[command(name = "prizetree")]
#[command(about = "Prize-collecting Steiner trees over biological networks", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one prize-collecting Steiner instance
    Solve(SolveArgs),

    /// Calibrate beta and lambda against a ground-truth gene list
    Calibrate(CalibrateArgs),
}

#[derive(Args)]
struct SolveArgs {
    /// Network edge-list file to operate on
    #[arg(long)]
    network_file: PathBuf,

    /// Whitespace-separated node prize file
    #[arg(long)]
    prize_file: PathBuf,

    /// Message-passing Steiner solver binary
    #[arg(long)]
    solver_bin: Option<PathBuf>,

    /// TOML configuration file for the experiment
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Directory for intermediate solver input files
    #[arg(long)]
    stp_dir: Option<PathBuf>,

    /// Directory for the result edge lists
    #[arg(long)]
    cluster_dir: Option<PathBuf>,

    /// Directory for run logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory for the artificial-prize dumps
    #[arg(long)]
    art_prizes_dir: Option<PathBuf>,

    /// File listing constraint node-set files, one path per line
    #[arg(long)]
    cluster_list_file: Option<PathBuf>,

    /// Node prize and edge cost trade-off
    #[arg(short = 'b', long)]
    beta: Option<f64>,

    /// Scale of the artificial prizes
    #[arg(short = 'l', long)]
    lambda: Option<f64>,

    /// Non-linearity of the frequency-to-prize mapping
    #[arg(short = 'a', long)]
    alpha: Option<f64>,

    /// Experiment id; generated as <date>_<random> when omitted
    #[arg(long)]
    exp_id: Option<String>,

    /// Artificial prize mode, e.g. "positive" or "negative-proportional"
    #[arg(long)]
    prize_mode: Option<String>,

    /// Edge cost mode: "weight" or "1-weightsqd"
    #[arg(long)]
    cost_mode: Option<String>,

    /// Keep the solver input file and metadata JSON after the run
    #[arg(long)]
    retain_intermediate: Option<bool>,
}

#[derive(Args)]
struct CalibrateArgs {
    /// TOML file carrying the [calibration] section plus shared settings
    #[arg(long)]
    config_file: PathBuf,

    /// Whitespace-separated node prize file shared by every trial
    #[arg(long)]
    prize_file: PathBuf,

    /// Message-passing Steiner solver binary
    #[arg(long)]
    solver_bin: Option<PathBuf>,
}

#[derive(Deserialize)]
struct CalibrationFile {
    calibration: CalibrationConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Solve(args) => run_solve(cli.verbose, args),
        Commands::Calibrate(args) => run_calibrate(cli.verbose, args),
    }
}

fn run_solve(verbose: bool, args: SolveArgs) -> Result<()> {
    let mut settings = Settings::load(args.config_file.as_deref())?;
    apply_overrides(&mut settings, &args)?;

    let binary = settings.solver.binary.clone().context(
        "no solver binary configured; pass --solver-bin or set [solver].binary",
    )?;

    let exp_date = prizetree_pipeline::exp_date();
    let exp_id = args
        .exp_id
        .clone()
        .filter(|id| id != "None")
        .unwrap_or_else(|| prizetree_pipeline::generate_exp_id(&exp_date));
    let _guard = init_logging(verbose, &settings.paths.log_dir, &format!("{}.log", exp_id))?;

    let oracle = MsgSteiner::new(&binary).with_params(SolverParams::from(&settings.solver));
    let pipeline = SteinerPipeline::new(oracle, settings.paths.clone());

    let mut request = RunRequest::from_settings(&settings, &args.network_file, &args.prize_file);
    request.exp_id = Some(exp_id.clone());

    let output = pipeline.run(&request).context("steiner run failed")?;

    println!(
        "{} {} ({} nodes, {} edges)",
        "Tree found:".green().bold(),
        output.paths.result_details_file.display(),
        output.tree.node_count(),
        output.tree.edge_count()
    );
    println!("  experiment id: {}", exp_id.cyan());
    println!("  solver root:   {}", output.metadata.log.root);
    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &SolveArgs) -> Result<()> {
    if let Some(dir) = &args.stp_dir {
        settings.paths.stp_dir = dir.clone();
    }
    if let Some(dir) = &args.cluster_dir {
        settings.paths.cluster_dir = dir.clone();
    }
    if let Some(dir) = &args.log_dir {
        settings.paths.log_dir = dir.clone();
    }
    if let Some(dir) = &args.art_prizes_dir {
        settings.paths.art_prizes_dir = Some(dir.clone());
    }
    if let Some(file) = &args.cluster_list_file {
        settings.paths.cluster_list_file = Some(file.clone());
    }
    if let Some(beta) = args.beta {
        settings.parameters.beta = beta;
    }
    if let Some(lambda) = args.lambda {
        settings.parameters.lambda = lambda;
    }
    if let Some(alpha) = args.alpha {
        settings.parameters.alpha = alpha;
    }
    if let Some(mode) = &args.prize_mode {
        settings.steiner.prize_mode = mode.as_str().into();
    }
    if let Some(mode) = &args.cost_mode {
        // fail fast on an unknown mode, before any file is written
        settings.steiner.cost_mode = mode.parse()?;
    }
    if let Some(retain) = args.retain_intermediate {
        settings.steiner.retain_intermediate = retain;
    }
    if let Some(bin) = &args.solver_bin {
        settings.solver.binary = Some(bin.clone());
    }
    Ok(())
}

fn run_calibrate(verbose: bool, args: CalibrateArgs) -> Result<()> {
    let mut settings = Settings::load(Some(&args.config_file))?;
    if let Some(bin) = &args.solver_bin {
        settings.solver.binary = Some(bin.clone());
    }
    let binary = settings.solver.binary.clone().context(
        "no solver binary configured; pass --solver-bin or set [solver].binary",
    )?;

    let text = fs::read_to_string(&args.config_file)
        .with_context(|| format!("cannot read {}", args.config_file.display()))?;
    let calibration = toml::from_str::<CalibrationFile>(&text)
        .context("invalid or missing [calibration] section")?
        .calibration;

    let _guard = init_logging(verbose, &settings.paths.log_dir, "calibration.log")?;

    let oracle = MsgSteiner::new(&binary).with_params(SolverParams::from(&settings.solver));
    let mut runner = PipelineTrialRunner::new(oracle, settings, &args.prize_file);

    let outcome = {
        let mut search = HyperparameterSearch::new(&mut runner, &calibration)?;
        search.run()?
    };

    match outcome.termination {
        TerminationReason::Converged => {
            println!("{}", "Calibration converged".green().bold())
        }
        TerminationReason::CapReached => {
            println!("{}", "Calibration stopped at the round cap".yellow().bold())
        }
    }
    for (network, (beta, lambda)) in calibration
        .networks
        .iter()
        .zip(outcome.betas.iter().zip(outcome.lambdas.iter()))
    {
        println!(
            "  {}: beta {}, lambda {}",
            network.name.cyan(),
            beta,
            lambda
        );
    }
    Ok(())
}

fn init_logging(verbose: bool, log_dir: &Path, file_name: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(log_dir, file_name.to_string());
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        );
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(guard)
}
