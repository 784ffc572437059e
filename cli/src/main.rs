//! twinsync - command-line front end for the sync engine.
//!
//! Connects to one SSH host, runs a single command against it and prints
//! the result followed by the latest diagnostic log lines.

mod render;

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use twinsync_engine::{
    ChecksumAlgorithm, ChecksumScope, EngineError, Location, RemoteSession, SshSession,
    SyncConfig, SyncContext, SyncReport, CMD_LOG_MAX,
};

/// twinsync - smart copy between this machine and an SSH host
#[derive(Parser, Debug)]
#[command(name = "twinsync")]
#[command(version = "0.1.0")]
#[command(about = "Copy, move, compare and browse files between this machine and an SSH host")]
struct Args {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Remote host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Remote SSH port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Remote user name
    #[arg(long, value_name = "USER")]
    user: Option<String>,

    /// Password for the remote user
    #[arg(long, value_name = "PASSWORD", env = "TWINSYNC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Private key file
    #[arg(long, value_name = "FILE")]
    identity: Option<String>,

    /// Log every remote command and checksum
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(value_name = "SIDE:PATH", value_parser = parse_location)]
        location: Location,
    },
    /// Enter a directory (or ".." for the parent) and print where you end up
    Cd {
        #[arg(value_name = "SIDE:PATH", value_parser = parse_location)]
        location: Location,
        name: String,
    },
    /// Copy a file or directory, skipping large files that are already identical
    Copy {
        #[arg(value_name = "SRC", value_parser = parse_location)]
        source: Location,
        #[arg(value_name = "DST", value_parser = parse_location)]
        destination: Location,
    },
    /// Copy, then remove the source if every item made it
    Move {
        #[arg(value_name = "SRC", value_parser = parse_location)]
        source: Location,
        #[arg(value_name = "DST", value_parser = parse_location)]
        destination: Location,
    },
    /// Delete a file or directory tree
    Rm {
        #[arg(value_name = "SIDE:PATH", value_parser = parse_location)]
        location: Location,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Compare the files of a local and a remote directory
    Diff {
        /// Local directory (defaults to initialLocalPath)
        local: Option<PathBuf>,
        /// Remote directory (defaults to initialRemotePath)
        remote: Option<String>,
        /// Compare whole files instead of the leading partialMb MiB
        #[arg(long)]
        full: bool,
        /// md5, sha1, sha256 or blake3 (defaults to the configured algorithm)
        #[arg(long, value_name = "ALGORITHM")]
        algorithm: Option<String>,
    },
}

/// How a command that ran to completion went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    ItemsFailed,
}

/// Parse `local:<path>` or `remote:<path>`.
fn parse_location(value: &str) -> Result<Location, String> {
    let (side, path) = value
        .split_once(':')
        .ok_or_else(|| format!("'{}' must be written local:<path> or remote:<path>", value))?;
    if path.is_empty() {
        return Err(format!("'{}' has an empty path", value));
    }
    match side.to_lowercase().as_str() {
        "local" | "l" => Ok(Location::local(path)),
        "remote" | "r" => Ok(Location::remote(path)),
        _ => Err(format!("unknown side '{}'; use local or remote", side)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the config file, then command-line flags.
fn build_config(args: &Args) -> Result<SyncConfig, String> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path).map_err(|e| e.to_string())?,
        None => SyncConfig::default(),
    };

    if let Some(host) = &args.host {
        config.remote.host = host.clone();
    }
    if let Some(port) = args.port {
        config.remote.port = port;
    }
    if let Some(user) = &args.user {
        config.remote.user = user.clone();
    }
    if let Some(password) = &args.password {
        config.remote.password = Some(password.clone());
    }
    if let Some(identity) = &args.identity {
        config.remote.identity_file = Some(identity.clone());
    }
    if config.remote.user.is_empty() {
        config.remote.user = std::env::var("USER").unwrap_or_default();
    }

    config.validate().map_err(|e| e.to_string())?;
    tracing::debug!(
        host = %config.remote.host,
        port = config.remote.port,
        user = %config.remote.user,
        algorithm = %config.algorithm,
        "configuration resolved"
    );
    Ok(config)
}

/// Parse and validate command-line arguments, then run the command
fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let exit_code = match run_cli(&args) {
        Ok(Outcome::Clean) => 0,
        Ok(Outcome::ItemsFailed) => 1,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<Outcome, String> {
    let config = build_config(args)?;
    let session = SshSession::connect(&config.remote).map_err(|e| e.to_string())?;
    let mut context = SyncContext::from_config(session, &config).map_err(|e| e.to_string())?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();
    let result = execute(&mut context, &config, &args.command, &mut input, &mut out);

    let lines = context.log().latest(CMD_LOG_MAX);
    if !lines.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Log:");
        for line in lines {
            let _ = writeln!(out, "  {}", line);
        }
    }
    result
}

fn execute<S: RemoteSession>(
    context: &mut SyncContext<S>,
    config: &SyncConfig,
    command: &Command,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Outcome, String> {
    match command {
        Command::Ls { location } => {
            let fs = context.endpoints().fs(location.side());
            if !fs.is_dir(location) {
                return Err(format!("{} is not a directory", location.describe()));
            }
            print_lines(out, render::listing(&fs.list(location)))?;
            Ok(Outcome::Clean)
        }
        Command::Cd { location, name } => {
            let next = context.change_directory(location, name);
            print_lines(out, vec![next.describe()])?;
            Ok(Outcome::Clean)
        }
        Command::Copy { source, destination } => {
            let destination = resolve_destination(context, source, destination);
            let report = context.copy(source, &destination).map_err(|e| e.to_string())?;
            print_lines(out, render::report(&report))?;
            Ok(report_outcome(&report))
        }
        Command::Move { source, destination } => {
            let destination = resolve_destination(context, source, destination);
            let report = context
                .move_entry(source, &destination)
                .map_err(|e| e.to_string())?;
            print_lines(out, render::report(&report))?;
            if !report.source_removed {
                print_lines(out, vec![format!("Source kept: {}", source.describe())])?;
            }
            Ok(report_outcome(&report))
        }
        Command::Rm { location, yes } => {
            let question = format!("Delete {}? (y/n) ", location.describe());
            if !yes && !confirm(input, out, &question)? {
                print_lines(out, vec!["Cancelled".to_string()])?;
                return Ok(Outcome::Clean);
            }
            match context.delete_entry(location) {
                Ok(()) => Ok(Outcome::Clean),
                Err(e @ EngineError::NotFound { .. }) => Err(e.to_string()),
                Err(_) => Ok(Outcome::ItemsFailed),
            }
        }
        Command::Diff {
            local,
            remote,
            full,
            algorithm,
        } => {
            let local = Location::local(
                local
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&config.initial_local_path)),
            );
            let remote = Location::remote(remote.as_deref().unwrap_or(&config.initial_remote_path));
            let algorithm = match algorithm {
                Some(name) => ChecksumAlgorithm::from_str(name).ok_or_else(|| {
                    format!(
                        "Invalid hash algorithm '{}'. Must be 'md5', 'sha1', 'sha256', or 'blake3'",
                        name
                    )
                })?,
                None => context.policy().algorithm,
            };
            let scope = if *full {
                ChecksumScope::Full
            } else {
                ChecksumScope::Partial
            };

            let result = context
                .diff_top_level(&local, &remote, algorithm, scope)
                .map_err(|e| e.to_string())?;
            print_lines(
                out,
                vec![format!(
                    "Diff ({} {}) {} <-> {}",
                    scope,
                    algorithm,
                    local.describe(),
                    remote.describe()
                )],
            )?;
            print_lines(out, render::diff(&result))?;
            Ok(Outcome::Clean)
        }
    }
}

/// An existing directory as destination means "copy into it", like `cp`.
fn resolve_destination<S: RemoteSession>(
    context: &SyncContext<S>,
    source: &Location,
    destination: &Location,
) -> Location {
    let fs = context.endpoints().fs(destination.side());
    match source.file_name() {
        Some(name) if fs.is_dir(destination) => fs.join(destination, &name).unwrap_or_else(|_| destination.clone()),
        _ => destination.clone(),
    }
}

fn report_outcome(report: &SyncReport) -> Outcome {
    if report.has_failures() {
        Outcome::ItemsFailed
    } else {
        Outcome::Clean
    }
}

fn confirm(input: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<bool, String> {
    write!(out, "{}", question).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(|e| e.to_string())?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_lines(out: &mut impl Write, lines: Vec<String>) -> Result<(), String> {
    for line in lines {
        writeln!(out, "{}", line).map_err(|e| e.to_string())?;
    }
    Ok(())
}
