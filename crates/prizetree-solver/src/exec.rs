use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use tracing::debug;

use prizetree_core::{PrizeTreeError, Result, SolverConfig};

/// Tuning parameters of the external solver. Each `Some` value maps to one
/// flag in the argument vector; `None` omits the flag and lets the solver
/// use its own default.
#[derive(Debug, Clone)]
pub struct SolverParams {
    /// `-j`: worker threads inside the solver.
    pub threads: Option<u32>,
    /// `-d`: maximum tree depth.
    pub depth: Option<u32>,
    /// `-t`: maximum number of iterations.
    pub max_iterations: Option<u64>,
    /// `-e`: convergence tolerance.
    pub tolerance: Option<f64>,
    /// `-r`: random noise factor.
    pub noise: Option<f64>,
    /// `-g`: reinforcement parameter.
    pub reinforcement: Option<f64>,
    /// `-y`: convergence decision repeats.
    pub decision_repeats: Option<u32>,
    /// `-p`: prize assigned to terminals.
    pub terminal_prize: Option<f64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            threads: None,
            depth: Some(30),
            max_iterations: None,
            tolerance: None,
            noise: Some(0.0),
            reinforcement: Some(1e-3),
            decision_repeats: None,
            terminal_prize: None,
        }
    }
}

impl From<&SolverConfig> for SolverParams {
    fn from(config: &SolverConfig) -> Self {
        Self {
            threads: config.threads,
            depth: config.depth,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            noise: config.noise,
            reinforcement: config.reinforcement,
            decision_repeats: config.decision_repeats,
            terminal_prize: config.terminal_prize,
        }
    }
}

impl SolverParams {
    /// Translates the parameters into the solver's argument vector. The
    /// full tree is always requested on standard output (`-o`).
    pub fn to_argv(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string()];
        if let Some(threads) = self.threads {
            args.push("-j".to_string());
            args.push(threads.to_string());
        }
        if let Some(depth) = self.depth {
            args.push("-d".to_string());
            args.push(depth.to_string());
        }
        if let Some(maxit) = self.max_iterations {
            args.push("-t".to_string());
            args.push(maxit.to_string());
        }
        if let Some(tolerance) = self.tolerance {
            args.push("-e".to_string());
            args.push(tolerance.to_string());
        }
        if let Some(noise) = self.noise {
            args.push("-r".to_string());
            args.push(noise.to_string());
        }
        if let Some(rein) = self.reinforcement {
            args.push("-g".to_string());
            args.push(rein.to_string());
        }
        if let Some(decision) = self.decision_repeats {
            args.push("-y".to_string());
            args.push(decision.to_string());
        }
        if let Some(term_prize) = self.terminal_prize {
            args.push("-p".to_string());
            args.push(term_prize.to_string());
        }
        args
    }
}

/// Captured channels of one solver invocation.
#[derive(Debug, Clone)]
pub struct SolverInvocation {
    pub args: Vec<String>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// Runs the solver binary with the serialized input file on standard
/// input, blocking until it exits. A non-zero exit status or non-UTF-8
/// output is a hard error of the run; it is not retried.
pub fn execute(binary: &Path, stp_file: &Path, params: &SolverParams) -> Result<SolverInvocation> {
    let args = params.to_argv();
    debug!(
        "Executing command: {} {} (stdin from {})",
        binary.display(),
        args.join(" "),
        stp_file.display()
    );

    let input = File::open(stp_file)?;
    let start = Instant::now();
    let output = Command::new(binary)
        .args(&args)
        .stdin(Stdio::from(input))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    let duration = start.elapsed();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PrizeTreeError::Solver(format!(
            "solver exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = decode_lines(output.stdout, "stdout")?;
    let stderr = decode_lines(output.stderr, "stderr")?;

    debug!("Done. Duration: {:.3} seconds.", duration.as_secs_f64());

    Ok(SolverInvocation {
        args,
        stdout,
        stderr,
    })
}

fn decode_lines(bytes: Vec<u8>, channel: &str) -> Result<Vec<String>> {
    let text = String::from_utf8(bytes)
        .map_err(|e| PrizeTreeError::Solver(format!("undecodable solver {}: {}", channel, e)))?;
    Ok(text.trim().split('\n').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_argv_matches_flag_table() {
        let args = SolverParams::default().to_argv();
        assert_eq!(args, vec!["-o", "-d", "30", "-r", "0", "-g", "0.001"]);
    }

    #[test]
    fn all_flags_present_when_set() {
        let params = SolverParams {
            threads: Some(4),
            depth: Some(10),
            max_iterations: Some(1_000_000),
            tolerance: Some(1e-5),
            noise: Some(0.25),
            reinforcement: Some(0.001),
            decision_repeats: Some(5),
            terminal_prize: Some(100.0),
        };
        let args = params.to_argv();
        assert_eq!(args[0], "-o");
        for flag in ["-j", "-d", "-t", "-e", "-r", "-g", "-y", "-p"] {
            assert!(args.contains(&flag.to_string()), "missing {}", flag);
        }
        assert_eq!(args[args.iter().position(|a| a == "-j").unwrap() + 1], "4");
    }

    #[cfg(unix)]
    #[test]
    fn execute_feeds_stdin_and_captures_channels() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_solver.sh");
        std::fs::write(&script, "#!/bin/sh\ncat -\necho 'chosen root: A' >&2\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let stp = dir.path().join("input.stp");
        std::fs::write(&stp, "A B\nB C\n").unwrap();

        let invocation = execute(&script, &stp, &SolverParams::default()).unwrap();
        assert_eq!(invocation.stdout, vec!["A B", "B C"]);
        assert!(invocation.stderr[0].contains("root:"));
        assert_eq!(invocation.args[0], "-o");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_a_solver_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken_solver.sh");
        std::fs::write(&script, "#!/bin/sh\necho 'boom' >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let stp = dir.path().join("input.stp");
        std::fs::write(&stp, "").unwrap();

        let err = execute(&script, &stp, &SolverParams::default()).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn missing_binary_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let stp = dir.path().join("input.stp");
        std::fs::write(&stp, "").unwrap();
        let result = execute(
            Path::new("/nonexistent/msgsteiner"),
            &stp,
            &SolverParams::default(),
        );
        assert!(result.is_err());
    }
}
