pub mod buffers;
pub mod config;
pub mod driver;
pub mod errors;
pub mod feedback;
pub mod gateway;
pub mod logging;
pub mod policy;
pub mod routing;
pub mod runtime;
pub mod session;
pub mod types;

use clap::{error::ErrorKind, CommandFactory, Parser};
use config::{load_config, CliOverrides};
use driver::run_demo_job;
use errors::RecorderError;
use logging::{structured_fallback_line, JsonlLogger};
use policy::factory::PolicyFactory;
use runtime::{ProductionClock, ProductionMemoryProbe};
use session::{RecordingSession, SessionCollaborators};
use std::io::Write;
use std::sync::Arc;
use types::{PolicyKind, TimeFormat};

#[derive(Debug, Clone, Parser)]
#[command(name = "statrec")]
#[command(about = "Run a job under a recording session and write its results, summary and trace logs")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    #[arg(long)]
    pub output_dir: Option<std::path::PathBuf>,
    /// standard, trace or broadcast
    #[arg(long, value_parser = parse_policy)]
    pub policy: Option<PolicyKind>,
    /// iso8601, rfc2822, unix or elapsed
    #[arg(long, value_parser = parse_time_format)]
    pub time_format: Option<TimeFormat>,
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
    #[arg(long, default_value_t = 5)]
    pub iterations: usize,
    #[arg(long, default_value_t = false)]
    pub memory_diagnostics: bool,
}

fn parse_policy(value: &str) -> Result<PolicyKind, String> {
    PolicyKind::parse_cli(value).ok_or_else(|| format!("unknown policy `{value}`"))
}

fn parse_time_format(value: &str) -> Result<TimeFormat, String> {
    TimeFormat::parse_cli(value).ok_or_else(|| format!("unknown time format `{value}`"))
}

pub fn run() -> Result<i32, RecorderError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| RecorderError::Io(e.to_string()))?;
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stdout());
    let mut stdout = std::io::stdout();
    run_with_args(&args, &cwd, is_tty, &mut stdout)
}

pub fn run_with_args(
    args: &[std::ffi::OsString],
    cwd: &std::path::Path,
    is_tty: bool,
    out: &mut dyn Write,
) -> Result<i32, RecorderError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                write!(out, "{error}").map_err(|e| RecorderError::Io(e.to_string()))?;
                return Ok(0);
            }
            _ => return Err(RecorderError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        output_dir: cli.output_dir.clone(),
        policy: cli.policy,
        time_format: cli.time_format,
        memory_diagnostics: cli.memory_diagnostics,
    };
    let settings = load_config(&overrides, cwd)?;

    let kind = settings.config.recorder.policy;
    let policy = PolicyFactory::with_defaults().get(kind).ok_or_else(|| {
        RecorderError::InvalidConfig(format!("no policy registered for {}", kind.as_str()))
    })?;
    let persistence = Arc::new(settings.persistence());
    let logger = JsonlLogger::new(settings.run_log_path());
    let time_format = settings.config.recorder.time_format;
    let output_dir = settings.output_dir.clone();

    let session = RecordingSession::new(
        SessionCollaborators {
            configuration: Arc::new(settings),
            persistence,
            clock: Arc::new(ProductionClock),
            memory: Arc::new(ProductionMemoryProbe),
        },
        policy,
        time_format,
    )
    .with_logger(logger);

    let summary = run_demo_job(&session, cli.workers, cli.iterations)?;
    let message = format!(
        "recorded {} workers x {} iterations with {} policy into {}",
        summary.workers,
        summary.iterations,
        kind.as_str(),
        output_dir.display()
    );
    let line = if is_tty {
        message
    } else {
        structured_fallback_line("statrec", session.stage().as_str(), &message)
    };
    writeln!(out, "{line}").map_err(|e| RecorderError::Io(e.to_string()))?;
    Ok(0)
}

pub fn render_help() -> String {
    Cli::command().render_long_help().to_string()
}
