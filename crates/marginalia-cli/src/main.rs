//! Marginalia CLI.
//!
//! Terminal front-end for the Marginalia Nostr session: log in, inspect
//! the session, publish events and post highlights of a text file.
//!
//! # Usage
//!
//! ```text
//! marginalia keygen
//! marginalia login nsec nsec1...
//! marginalia status
//! marginalia context --file chapter1.txt --start 120 --end 164
//! marginalia highlight --file chapter1.txt --start 120 --end 164 \
//!     --title "Dune" --author "Frank Herbert"
//! marginalia --json publish --kind 1 --tag t=books "Reading again"
//! ```
//!
//! The session lives in `session.json` under the data directory.
//! Set `RUST_LOG` to change log verbosity; logs go to stderr.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::highlight::{ContextArgs, HighlightArgs};
use commands::publish::PublishArgs;
use commands::session::LoginAction;
use config::CliConfig;

/// Marginalia: Nostr login and highlights for a document reader.
#[derive(Parser)]
#[command(name = "marginalia", version, about, long_about = None)]
struct Cli {
    /// Output in JSON format (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the session file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Relay URL (repeatable). Replaces the configured relays.
    #[arg(long = "relay", global = true)]
    relays: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a key, extension or remote signer.
    Login {
        #[command(subcommand)]
        action: LoginAction,
    },
    /// Clear the stored session.
    Logout,
    /// Show the stored session.
    Status,
    /// Fetch the logged-in user's profile from relays.
    Profile,
    /// Generate a fresh key pair.
    Keygen,
    /// Sign and publish an event.
    Publish(PublishArgs),
    /// Print the sentence context around a selection in a file.
    Context(ContextArgs),
    /// Post a selection in a file as a highlight.
    Highlight(HighlightArgs),
}

/// Global options resolved once and passed to every command.
pub struct GlobalOpts {
    pub json: bool,
    pub config: CliConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.json { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match CliConfig::resolve(cli.config.as_deref(), cli.data_dir, &cli.relays) {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&e, cli.json);
            std::process::exit(1);
        }
    };

    let opts = GlobalOpts {
        json: cli.json,
        config,
    };

    if let Err(e) = dispatch(&opts, cli.command).await {
        output::print_error(&e, opts.json);
        std::process::exit(1);
    }
}

async fn dispatch(opts: &GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Login { action } => commands::session::login(action, opts).await,
        Commands::Logout => commands::session::logout(opts).await,
        Commands::Status => commands::session::status(opts),
        Commands::Profile => commands::session::profile(opts).await,
        Commands::Keygen => commands::keys::keygen(opts),
        Commands::Publish(args) => commands::publish::run(args, opts).await,
        Commands::Context(args) => commands::highlight::context(args, opts),
        Commands::Highlight(args) => commands::highlight::highlight(args, opts).await,
    }
}
