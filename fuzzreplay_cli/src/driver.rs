use fuzzreplay_core::config::ReplayConfig;
use fuzzreplay_core::executor::{IsolationKind, build_executor, run_child};
use fuzzreplay_core::report::RunSummary;
use fuzzreplay_core::replay::Replayer;
use fuzzreplay_core::target::FuzzTarget;

use clap::{Parser, ValueEnum};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "FUZZREPLAY_LOG";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliIsolation {
    Fork,
    Spawn,
}

impl From<CliIsolation> for IsolationKind {
    fn from(value: CliIsolation) -> Self {
        match value {
            CliIsolation::Fork => IsolationKind::Fork,
            CliIsolation::Spawn => IsolationKind::Spawn,
        }
    }
}

/// Replays saved inputs against a fuzz target, one isolated process per input.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Wait for enter before replaying so a debugger can be attached.
    #[clap(short = 'd')]
    pub wait_for_debugger: bool,
    #[clap(short, long, value_parser)]
    pub config_file: Option<PathBuf>,
    /// How each input is isolated [default: fork on unix, spawn elsewhere]
    #[clap(long, value_enum)]
    pub isolation: Option<CliIsolation>,
    /// Internal: replay a single input and exit with its verdict code.
    #[clap(long = "fuzz-child", hide = true, value_name = "PATH", allow_hyphen_values = true)]
    pub fuzz_child: Option<PathBuf>,
    /// Input files to replay.
    #[clap(value_parser)]
    pub inputs: Vec<PathBuf>,
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point for a replay driver binary built around `target`.
///
/// Exits successfully whenever the replay ran to completion, however many inputs
/// crashed. In child mode the exit code is the single input's verdict instead.
pub fn run_main(target: FuzzTarget) -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    if let Some(path) = &cli.fuzz_child {
        let code = run_child(&target, path);
        return ExitCode::from(code as u8);
    }

    match run(target, cli, io::stderr()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Resolves configuration, runs the initialize hook and replays every input,
/// writing diagnostics and the summary to `diag`.
pub fn run<W: Write>(target: FuzzTarget, cli: Cli, diag: W) -> Result<RunSummary, anyhow::Error> {
    let config = ReplayConfig::resolve(cli.config_file.as_deref())?;
    let isolation = cli
        .isolation
        .map(IsolationKind::from)
        .unwrap_or(config.executor.isolation);
    tracing::debug!(isolation = isolation.as_str(), "effective configuration: {config:?}");

    if cli.wait_for_debugger || config.driver.wait_for_debugger {
        wait_for_debugger()?;
    }

    let program = std::env::args_os()
        .next()
        .unwrap_or_else(|| OsString::from(env!("CARGO_PKG_NAME")));
    let mut args = vec![program];
    args.extend(config.driver.inputs.into_iter().map(PathBuf::into_os_string));
    args.extend(cli.inputs.into_iter().map(PathBuf::into_os_string));
    if target.initialize(&mut args) {
        tracing::debug!(remaining = args.len().saturating_sub(1), "initialize hook ran");
    }
    let inputs: Vec<PathBuf> = args.into_iter().skip(1).map(PathBuf::from).collect();

    let mut executor = build_executor(isolation, target)?;
    Ok(Replayer::new(executor.as_mut(), diag).run(&inputs))
}

fn wait_for_debugger() -> io::Result<()> {
    eprintln!(
        "\nNow attach debugger to process {} and press enter.",
        std::process::id()
    );
    if cfg!(target_os = "linux") {
        eprintln!(
            "If you get an error from ptrace 'Could not attach to the process.' \
             Use 'echo 0 | sudo tee /proc/sys/kernel/yama/ptrace_scope' to relax \
             restrictions temporarily."
        );
    }
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(())
}
