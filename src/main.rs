//! outbreak - infection lifecycle bot
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::DateTime;
use clap::{Parser, Subcommand};

use outbreak::cli::{file_journal, file_runner};
use outbreak::config::{outbreak_home, Config};
use outbreak::core::{Clock, FixedClock, SystemClock, WindowOracle};
use outbreak::error::{exit_codes, OutbreakError};
use outbreak::observability::{init_logging, LogFormat};

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

// =============================================================================
// CLI Definition
// =============================================================================

/// outbreak - infection lifecycle bot for chat communities
#[derive(Parser)]
#[command(name = "outbreak")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./outbreak.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Output as JSON
    #[arg(long, short, global = true)]
    json: bool,

    /// Suppress output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass over every member
    Sweep,

    /// Start treatment for a member
    Accept {
        /// Member id
        member: String,
    },

    /// Feed a quick action a member clicked on a message
    React {
        /// Member id
        member: String,
        /// Message reference the action was clicked on
        message: String,
        /// Quick-action symbol (default: the configured accept symbol)
        symbol: Option<String>,
    },

    /// Show tracked members and their deadlines
    Status,

    /// Show whether a treatment window is open
    Window,

    /// Show recent lifecycle transitions
    History {
        /// Maximum number of events
        #[arg(long, short)]
        limit: Option<usize>,
        /// Only events for this member
        #[arg(long)]
        member: Option<String>,
    },

    /// Create outbreak.toml and the data directory
    Init {
        /// Force overwrite existing files
        #[arg(long, short)]
        force: bool,
        /// Community id to write into the config
        #[arg(long)]
        community: Option<String>,
        /// Data directory (default: ~/.outbreak/data)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("outbreak error: {}", e);
            let fatal = e
                .downcast_ref::<OutbreakError>()
                .is_some_and(OutbreakError::is_fatal);
            if fatal {
                ExitCode::from(exit_codes::CONFIG as u8)
            } else {
                ExitCode::from(exit_codes::ERROR as u8)
            }
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.outbreak/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("outbreak panic: {}", info);

        if let Some(home) = outbreak_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run(cli: Cli) -> CliResult {
    let config_path = cli.config.as_deref();
    let at = cli.at.as_deref();
    let (json, quiet) = (cli.json, cli.quiet);

    match cli.command {
        Commands::Sweep => run_sweep(config_path, at, json, quiet),
        Commands::Accept { member } => run_accept(config_path, at, &member, json, quiet),
        Commands::React {
            member,
            message,
            symbol,
        } => run_react(config_path, at, &member, &message, symbol, json, quiet),
        Commands::Status => run_status(config_path, at, json, quiet),
        Commands::Window => run_window(config_path, at, json, quiet),
        Commands::History { limit, member } => run_history(config_path, limit, member, json, quiet),
        Commands::Init {
            force,
            community,
            data_dir,
        } => run_init(force, community, data_dir, json, quiet),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Load and validate configuration. Any failure here is fatal.
fn load_config(path: Option<&Path>) -> Result<Config, OutbreakError> {
    let config = Config::load(path)?;
    config.validate()?;
    Ok(config)
}

/// The clock commands evaluate against: `--at` when given, else wall time.
fn make_clock(config: &Config, at: Option<&str>) -> Result<Arc<dyn Clock>, OutbreakError> {
    let offset = config.schedule.offset()?;
    match at {
        Some(value) => {
            let instant = DateTime::parse_from_rfc3339(value).map_err(|e| {
                OutbreakError::config(format!("invalid --at value '{}': {}", value, e))
            })?;
            Ok(Arc::new(FixedClock::new(instant.with_timezone(&offset))))
        }
        None => Ok(Arc::new(SystemClock::new(offset))),
    }
}

/// Print formatted output unless empty.
fn emit(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
    }
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::OK as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_sweep(config_path: Option<&Path>, at: Option<&str>, json: bool, quiet: bool) -> CliResult {
    use outbreak::cli::sweep::{SweepCommand, SweepOptions};

    let config = load_config(config_path)?;
    let clock = make_clock(&config, at)?;
    let cmd = SweepCommand::new(file_runner(&config, clock)?);
    let options = SweepOptions { json, quiet };

    let output = cmd.run(&options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_accept(
    config_path: Option<&Path>,
    at: Option<&str>,
    member: &str,
    json: bool,
    quiet: bool,
) -> CliResult {
    use outbreak::cli::accept::{AcceptCommand, AcceptOptions};

    let config = load_config(config_path)?;
    let clock = make_clock(&config, at)?;
    let cmd = AcceptCommand::new(file_runner(&config, clock)?);
    let options = AcceptOptions { json, quiet };

    let output = cmd.run(member, &options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

#[allow(clippy::too_many_arguments)]
fn run_react(
    config_path: Option<&Path>,
    at: Option<&str>,
    member: &str,
    message: &str,
    symbol: Option<String>,
    json: bool,
    quiet: bool,
) -> CliResult {
    use outbreak::cli::accept::{AcceptCommand, AcceptOptions};

    let config = load_config(config_path)?;
    let clock = make_clock(&config, at)?;
    let symbol = symbol.unwrap_or_else(|| config.community.action_symbol.clone());
    let cmd = AcceptCommand::new(file_runner(&config, clock)?);
    let options = AcceptOptions { json, quiet };

    let output = cmd.run_action(member, message, &symbol, &options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_status(config_path: Option<&Path>, at: Option<&str>, json: bool, quiet: bool) -> CliResult {
    use outbreak::cli::status::{StatusCommand, StatusOptions};

    let config = load_config(config_path)?;
    let clock = make_clock(&config, at)?;
    let cmd = StatusCommand::new(file_runner(&config, clock)?);
    let options = StatusOptions { json, quiet };

    let output = cmd.run(&options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_window(config_path: Option<&Path>, at: Option<&str>, json: bool, quiet: bool) -> CliResult {
    use outbreak::cli::window::{WindowCommand, WindowOptions};

    // Only the schedule matters here; community settings may be incomplete.
    let config = Config::load(config_path)?;
    let clock = make_clock(&config, at)?;
    let cmd = WindowCommand::new(WindowOracle::from_config(&config.schedule)?);
    let options = WindowOptions { json, quiet };

    let output = cmd.run(clock.now(), &options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(true))
}

fn run_history(
    config_path: Option<&Path>,
    limit: Option<usize>,
    member: Option<String>,
    json: bool,
    quiet: bool,
) -> CliResult {
    use outbreak::cli::history::{HistoryCommand, HistoryOptions};

    let config = load_config(config_path)?;
    let cmd = HistoryCommand::new(file_journal(&config)?);
    let options = HistoryOptions {
        json,
        quiet,
        limit,
        member,
    };

    let output = cmd.run(&options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_init(
    force: bool,
    community: Option<String>,
    data_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> CliResult {
    use outbreak::cli::init::{InitCommand, InitOptions};

    let cmd = InitCommand::new(std::env::current_dir()?);
    let options = InitOptions {
        json,
        quiet,
        force,
        community,
        data_dir,
    };

    let output = cmd.run(&options);
    emit(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}
