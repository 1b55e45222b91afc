#![deny(unsafe_code)]

mod commands;
mod config;
mod exit_code;
mod output;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sharebox_core::{ShareError, ShareErrorKind, ShareOperations, TracingIndex};

use crate::commands::checksum::ChecksumMismatch;
use crate::commands::{
    Session, checksum, comment, completions, get, ls, mkdir, mv, put, rename, rm, shares,
};
use crate::config::Config;

/// Command-line interface for sandboxed sharebox directories
#[derive(Parser)]
#[command(name = "sharebox")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List the share root
    sharebox --root ~/Public ls

    # Upload with a comment, then read the stored checksum
    sharebox --root ~/Public put / ./report.pdf --comment \"Q3 figures\"
    sharebox --root ~/Public checksum / report.pdf --verify

    # Use a share alias (from ~/.config/sharebox/config.toml)
    sharebox --root @music ls albums
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Share root directory, or @alias from the config file
    #[arg(long, env = "SHAREBOX_ROOT", global = true)]
    root: Option<String>,

    /// Report indexing events for uploads, renames, moves and comment changes
    #[arg(long, global = true)]
    index: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    Ls(ls::Args),

    /// Upload a local file or stdin
    Put(put::Args),

    /// Download a file
    Get(get::Args),

    /// Create a directory
    Mkdir(mkdir::Args),

    /// Delete a file or directory tree
    Rm(rm::Args),

    /// Move a file to another directory
    Mv(mv::Args),

    /// Rename a file within its directory
    Rename(rename::Args),

    /// Show or set a file's comment
    Comment(comment::Args),

    /// Show a file's stored checksum
    Checksum(checksum::Args),

    /// List configured share aliases
    Shares(shares::Args),

    /// Generate shell completions
    Completions(completions::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            // Quiet is parsed separately so that parse-time errors honour it too
            let is_quiet = std::env::args().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    let config = Config::load()?;

    match &cli.command {
        Commands::Ls(args) => ls::execute(&open_session(&cli, &config)?, args),
        Commands::Put(args) => put::execute(&open_session(&cli, &config)?, args),
        Commands::Get(args) => get::execute(&open_session(&cli, &config)?, args),
        Commands::Mkdir(args) => mkdir::execute(&open_session(&cli, &config)?, args),
        Commands::Rm(args) => rm::execute(&open_session(&cli, &config)?, args),
        Commands::Mv(args) => mv::execute(&open_session(&cli, &config)?, args),
        Commands::Rename(args) => rename::execute(&open_session(&cli, &config)?, args),
        Commands::Comment(args) => comment::execute(&open_session(&cli, &config)?, args),
        Commands::Checksum(args) => checksum::execute(&open_session(&cli, &config)?, args),
        Commands::Shares(args) => shares::execute(&config, args),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Resolve the share from `--root` and the config file, and open it.
fn open_session(cli: &Cli, config: &Config) -> Result<Session> {
    let share_config = config.share_config(cli.root.as_deref())?;
    tracing::debug!(root = %share_config.root.display(), seed = %share_config.seed, "Opening share");

    let mut ops = ShareOperations::new(&share_config)
        .with_context(|| format!("Failed to open share at {}", share_config.root.display()))?;
    if cli.index {
        ops = ops.with_index(Arc::new(TracingIndex));
    }

    Ok(Session {
        ops,
        index: cli.index,
        quiet: cli.quiet,
    })
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ChecksumMismatch>().is_some() {
            return exit_code::CHECKSUM_MISMATCH;
        }

        if let Some(share_err) = cause.downcast_ref::<ShareError>() {
            return match share_err.kind() {
                ShareErrorKind::NotFound => exit_code::NOT_FOUND,
                ShareErrorKind::AccessDenied => exit_code::PERMISSION_DENIED,
                ShareErrorKind::AlreadyExists
                | ShareErrorKind::NotADirectory
                | ShareErrorKind::NotAFile => exit_code::CONFLICT,
                ShareErrorKind::IndexingFailed => exit_code::INDEX_FAILED,
                kind if kind.is_caller_error() => exit_code::INVALID_INPUT,
                _ => match share_err {
                    ShareError::Io { source, .. } => io_exit_code(source),
                    _ => exit_code::GENERAL_ERROR,
                },
            };
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            let code = io_exit_code(io_err);
            if code != exit_code::GENERAL_ERROR {
                return code;
            }
        }
    }

    let msg = format!("{e:#}").to_lowercase();
    if msg.contains("cancelled") || msg.contains("interrupted") {
        exit_code::CANCELLED
    } else if msg.contains("share alias") || msg.contains("no share root") {
        exit_code::INVALID_INPUT
    } else {
        exit_code::GENERAL_ERROR
    }
}

fn io_exit_code(err: &io::Error) -> u8 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => exit_code::PERMISSION_DENIED,
        io::ErrorKind::NotFound => exit_code::NOT_FOUND,
        io::ErrorKind::Interrupted => exit_code::CANCELLED,
        _ => exit_code::GENERAL_ERROR,
    }
}
