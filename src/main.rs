mod boundary;
mod classify;
mod commands;
mod config;
mod diagnostics;
mod error;
mod info;
mod markdown;
mod matcher;
mod repository;
mod rewrite;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{GlobalFlags, Settings};

/// Exit code for runtime errors.
const EXIT_ERROR: u8 = 3;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GHLINK_LOG";

/// Link GitHub references in markdown
#[derive(Parser)]
#[command(name = "ghlink", version)]
struct Cli {
    /// Web root for links, e.g. a GitHub Enterprise host
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,

    /// Do not read the repository from Cargo.toml or package.json
    #[arg(long, global = true)]
    no_discover: bool,

    /// Render mention labels without strong emphasis
    #[arg(long, global = true)]
    no_mention_strong: bool,

    /// Repository references resolve against (`user/project` or a URL)
    #[arg(long, global = true)]
    repository: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Rewrite markdown files in place
    Apply {
        /// Files to rewrite (default: every markdown file under the current directory)
        files: Vec<PathBuf>,
    },
    /// List markdown files that would change (exit 1 if any)
    Check {
        /// Files to check (default: every markdown file under the current directory)
        files: Vec<PathBuf>,
    },
    /// Show usage, configuration, and current state
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record the repository in .ghlink.toml
    Init {
        /// Repository (`user/project`, `github:user/project`, or a URL)
        #[arg(value_name = "REPOSITORY")]
        value: String,
    },
    /// Print one rewritten document to stdout
    Render {
        /// Markdown file, or `-` for stdin
        file: Option<PathBuf>,
    },
    /// List recognized references and GitHub links
    Scan {
        /// Files to scan (default: every markdown file under the current directory)
        files: Vec<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-run check whenever markdown or config changes
    Watch,
}

/// Install the tracing subscriber. `GHLINK_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let env_filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("ghlink=debug"),
        Err(_) => EnvFilter::new("ghlink=warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse arguments and run one subcommand.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let flags = GlobalFlags {
        base_url: cli.base_url.as_deref(),
        no_discover: cli.no_discover,
        no_mention_strong: cli.no_mention_strong,
        repository: cli.repository.as_deref(),
    };

    let result = match cli.command {
        Commands::Apply { files } => {
            Settings::load(&flags).and_then(|s| return commands::apply(&s, &files)).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Check { files } => Settings::load(&flags).and_then(|s| return commands::check(&s, &files)),
        Commands::Render { file } => Settings::load(&flags)
            .and_then(|s| return commands::render(&s, file.as_deref()))
            .map(|()| return ExitCode::SUCCESS),
        Commands::Scan { files, json } => Settings::load(&flags)
            .and_then(|s| return commands::scan(&s, &files, json))
            .map(|()| return ExitCode::SUCCESS),
        Commands::Init { value } => commands::init(&value).map(|()| return ExitCode::SUCCESS),
        Commands::Info { json } => {
            commands::info(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Watch => watch::run(&flags),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_ERROR)
        },
    };
}
