use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod actors;
mod bus;
mod commands;
mod live;
mod state;
mod store;

use commands::{CheckArgs, PlayArgs, StatsCommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "oche", about = "Dart training engine")]
struct Config {
    /// Config file path (default: ~/.config/oche/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Play a live game against the simulated boards from the config file
    Run {
        /// Mode id (default: `[game] default_mode`)
        #[arg(long)]
        mode: Option<String>,
        /// End the game after this many darts
        #[arg(long)]
        darts: Option<u32>,
        /// Target for modes that need one
        #[arg(long)]
        target: Option<u8>,
    },
    /// List the game modes
    Modes {
        /// Training programs only
        #[arg(long)]
        training: bool,
    },
    /// Suggested three-dart finish for a remaining score
    Checkout { score: u32 },
    /// Validate one dart against a mode
    Check(CheckArgs),
    /// Play a game from a list of dart labels
    Play(PlayArgs),
    /// Query recorded statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("oche=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    // Load (or create) config file
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);
    let config = state::config::load(&config_path);
    let stats_path = state::config::statistics_path(&config);

    match cli.command {
        Command::Run {
            mode,
            darts,
            target,
        } => live::run(
            config_path,
            config,
            live::RunOptions {
                mode,
                darts,
                target,
            },
        ),
        Command::Modes { training } => commands::list_modes(training, cli.json),
        Command::Checkout { score } => commands::show_checkout(score, cli.json),
        Command::Check(args) => commands::check_throw(&args, cli.json),
        Command::Play(args) => commands::play(&config, &stats_path, &args),
        Command::Stats { command } => commands::stats(&stats_path, &command, cli.json),
    }
}
