//! One-shot CLI commands. These run without the bus: they drive the engine
//! and the statistics store directly and print to stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::store::JsonFileStore;
use oche::modes::{self, GameMode};
use oche::{
    GameState, Multiplier, OcheConfig, Statistics, Throw, ThrowOutcome, checkout, validate_throw,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Clone)]
pub struct PlayArgs {
    /// Mode id (see `oche modes`)
    pub mode: String,

    /// Dart labels in throwing order: T20 D16 S5 25 Bull Miss
    #[arg(required = true)]
    pub darts: Vec<String>,

    /// Target for modes that need one (segment number, 25 = bull)
    #[arg(long)]
    pub target: Option<u8>,

    /// Record under this player id instead of the configured one
    #[arg(long)]
    pub player: Option<String>,

    /// Play through without saving statistics
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Mode id
    pub mode: String,

    /// Segment hit: 1-20, 25 for the bull, 0 for a miss
    pub segment: u8,

    #[arg(long, value_enum, default_value_t = Multiplier::Single)]
    pub ring: Multiplier,

    /// Remaining score before the dart (countdown modes)
    #[arg(long)]
    pub remaining: Option<u32>,

    /// Selected target (modes that need one)
    #[arg(long)]
    pub target: Option<u8>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StatsCommand {
    /// Totals across every recorded game
    Overview,
    /// Players ranked by overall average
    Top {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Aggregates for one mode
    Mode { mode: String },
    /// Activity over the last N days
    Daily {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// One player's aggregate
    Player { id: String },
    /// Most recent games
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write every player result as CSV
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete every recorded game
    Clear,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub fn list_modes(training_only: bool, json: bool) -> Result<()> {
    let modes: Vec<&GameMode> = if training_only {
        modes::training_modes().collect()
    } else {
        modes::all_modes().iter().collect()
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&modes)?);
        return Ok(());
    }
    for mode in modes {
        let tag = if mode.rules.training_mode { " [training]" } else { "" };
        println!("{:<26} {}{tag}", mode.id, mode.name);
        println!("{:<26} {}", "", mode.description);
    }
    Ok(())
}

pub fn show_checkout(score: u32, json: bool) -> Result<()> {
    let finish = checkout::lookup(score);
    if json {
        println!("{}", serde_json::json!({ "score": score, "finish": finish }));
        return Ok(());
    }
    match finish {
        Some(darts) => println!("{score}: {}", darts.join(" ")),
        None => println!("{score}: no suggested finish"),
    }
    Ok(())
}

/// Validate a single dart against a mode at a given position.
pub fn check_throw(args: &CheckArgs, json: bool) -> Result<()> {
    let throw = Throw::new(args.segment, args.ring);
    let resolved = modes::resolve(&args.mode);
    if resolved.fell_back {
        tracing::warn!("unknown mode '{}', checking against {}", args.mode, resolved.mode.id);
    }
    let mut game = GameState::for_mode(resolved.mode);
    if let Some(target) = args.target {
        game.select_target(target)?;
    }
    if let Some(remaining) = args.remaining {
        game.current_score = remaining;
    }

    let verdict = validate_throw(resolved.mode.id, &game, &throw);
    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        let mark = if verdict.valid { "ok" } else { "rejected" };
        println!("{throw}: {mark} ({})", verdict.reason);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Play
// ---------------------------------------------------------------------------

/// Target to preselect for `mode`, if it needs one: the explicit choice,
/// then the configured default when it is valid, then the first selectable.
pub fn pick_target(mode: &GameMode, explicit: Option<u8>, configured: Option<u8>) -> Option<u8> {
    if !mode.needs_selection() {
        return None;
    }
    let selectable = mode.rules.selectable_targets;
    explicit
        .or(configured.filter(|t| selectable.contains(t)))
        .or_else(|| selectable.first().copied())
}

/// One line per dart, shared with the live `run` output.
pub fn render_outcome(throw: &Throw, outcome: &ThrowOutcome) -> String {
    let mut line = if outcome.valid {
        format!("{:>5}  {:>4}  {}", throw.label(), outcome.score, outcome.reason)
    } else {
        format!("{:>5}  {:>4}  {} (rejected)", throw.label(), outcome.score, outcome.reason)
    };
    if let Some(terminal) = outcome.terminal {
        line.push_str(&format!("  [{terminal:?}]"));
    }
    if let Some(suggestion) = &outcome.checkout_suggestion {
        line.push_str(&format!("  finish: {}", suggestion.join(" ")));
    }
    line
}

pub fn play(config: &OcheConfig, stats_path: &Path, args: &PlayArgs) -> Result<()> {
    let darts = args
        .darts
        .iter()
        .map(|label| label.parse::<Throw>().map_err(|e| anyhow!(e)))
        .collect::<Result<Vec<Throw>>>()?;

    let resolved = modes::resolve(&args.mode);
    if resolved.fell_back {
        tracing::warn!("unknown mode '{}', playing {}", args.mode, resolved.mode.id);
    }
    let mode = resolved.mode;
    let mut game = GameState::for_mode(mode);
    if let Some(target) = pick_target(mode, args.target, config.game.default_target) {
        game.select_target(target)?;
        println!("{} (target {target})", mode.name);
    } else {
        println!("{}", mode.name);
    }

    let mut thrown = 0;
    for throw in &darts {
        let outcome = game.throw_dart(*throw);
        println!("{}", render_outcome(throw, &outcome));
        thrown += 1;
        if !game.is_playing {
            break;
        }
    }
    if thrown < darts.len() {
        tracing::warn!("game over, ignored {} remaining darts", darts.len() - thrown);
    }

    println!(
        "darts {}  points {}  average {:.2}{}",
        game.darts_thrown(),
        game.points_scored(),
        game.average(),
        if game.is_won() { "  (won)" } else { "" }
    );
    let summary = game.summary();
    println!(
        "accuracy {:.1}%  doubles {:.1}%  trebles {:.1}%  best {}  worst {}",
        summary.accuracy * 100.0,
        summary.double_rate * 100.0,
        summary.triple_rate * 100.0,
        summary.best_dart,
        summary.worst_dart
    );

    let player_id = args.player.as_deref().unwrap_or(&config.player.id);
    let player_name = if args.player.is_some() {
        player_id
    } else {
        config.player.name.as_str()
    };
    let Some(record) = game.to_record(player_id, player_name, Utc::now()) else {
        return Ok(());
    };
    if args.dry_run {
        tracing::info!("dry run, not recording");
        return Ok(());
    }
    let mut stats = open_stats(stats_path)?;
    let saved = stats.record_game(record)?;
    println!("recorded game {}", saved.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn open_stats(path: &Path) -> Result<Statistics<JsonFileStore>> {
    Statistics::open(JsonFileStore::new(path))
        .with_context(|| format!("opening statistics at {}", path.display()))
}

pub fn stats(stats_path: &Path, command: &StatsCommand, json: bool) -> Result<()> {
    let mut stats = open_stats(stats_path)?;
    match command {
        StatsCommand::Overview => {
            let overall = stats.overall();
            if json {
                let value = serde_json::json!({
                    "overall": overall,
                    "modes": stats.mode_distribution(),
                    "most_played_mode": stats.most_played_mode(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("games          {}", overall.total_games);
                println!("darts          {}", overall.total_darts);
                println!("best average   {:.2}", overall.best_average);
                println!("best dart      {}", overall.best_score);
                println!("checkout rate  {:.1}%", overall.checkout_rate * 100.0);
                for (mode, count) in stats.mode_distribution() {
                    println!("  {mode:<26} {count}");
                }
            }
        }
        StatsCommand::Top { limit } => {
            let ranking: Vec<_> = stats.player_ranking().into_iter().take(*limit).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&ranking)?);
            } else {
                for entry in ranking {
                    let p = &entry.player;
                    println!(
                        "{:>3}. {:<20} avg {:>6.2}  games {:>4}  wins {:>4}",
                        entry.rank, p.name, p.overall_average, p.games, p.wins
                    );
                }
            }
        }
        StatsCommand::Mode { mode } => {
            let mode_stats = stats.mode_stats(mode);
            if json {
                println!("{}", serde_json::to_string_pretty(&mode_stats)?);
            } else if let Some(s) = mode_stats {
                println!(
                    "{}: {} games, {:.1} darts/game, {:.1} points/game",
                    s.mode, s.games, s.average_darts_per_game, s.average_score
                );
            } else {
                println!("{mode}: no games recorded");
            }
        }
        StatsCommand::Daily { days } => {
            let daily = stats.daily_stats(*days, Utc::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&daily)?);
            } else {
                println!(
                    "last {} days: {} games, {} darts, {:.2} games/day, most played {}",
                    daily.days,
                    daily.games,
                    daily.total_darts,
                    daily.average_games_per_day,
                    daily.most_played_mode.as_deref().unwrap_or("-")
                );
            }
        }
        StatsCommand::Player { id } => {
            let player = stats
                .player(id)
                .with_context(|| format!("no statistics for player '{id}'"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(player)?);
            } else {
                println!("{} ({})", player.name, player.id);
                println!("  games {}  wins {}", player.games, player.wins);
                println!(
                    "  average {:.2}  best {:.2}",
                    player.overall_average, player.best_average
                );
                println!("  checkout rate {:.1}%", player.checkout_rate() * 100.0);
            }
        }
        StatsCommand::History { limit } => {
            let games = stats.recent_games(*limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&games)?);
            } else {
                for game in games {
                    println!(
                        "{}  {:<26} {:>3} darts  winner {}",
                        game.timestamp.format("%Y-%m-%d %H:%M"),
                        game.mode,
                        game.total_darts,
                        game.winner.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        StatsCommand::Export { out } => {
            let csv = stats.export_csv();
            match out {
                Some(path) => {
                    std::fs::write(path, csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
        StatsCommand::Clear => {
            let games = stats.snapshot().games.len();
            stats.clear()?;
            println!("cleared {games} games");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_target_prefers_explicit_then_config() {
        let mode = modes::get_mode("target-focus-programm1");
        assert_eq!(pick_target(mode, Some(18), Some(19)), Some(18));
        assert_eq!(pick_target(mode, None, Some(19)), Some(19));
        assert_eq!(pick_target(mode, None, Some(3)), Some(20));
        assert_eq!(pick_target(modes::get_mode("501"), Some(18), None), None);
    }

    #[test]
    fn render_marks_rejections_and_finishes() {
        let mut game = GameState::new_game("501-double-out");
        game.current_score = 32;
        let throw = Throw::triple(20);
        let outcome = game.throw_dart(throw);
        assert!(render_outcome(&throw, &outcome).contains("(rejected)"));
        assert_eq!(game.current_score, 32);

        let throw = Throw::double(16);
        let outcome = game.throw_dart(throw);
        assert!(render_outcome(&throw, &outcome).contains("[Checkout]"));
    }

    #[test]
    fn play_records_unless_dry_run() {
        let dir = std::env::temp_dir().join(format!("oche-play-test-{}", std::process::id()));
        let path = dir.join("statistics.json");
        let mut args = PlayArgs {
            mode: "301".into(),
            darts: vec!["T20".into(), "T20".into(), "T20".into()],
            target: None,
            player: Some("ann".into()),
            dry_run: true,
        };
        let config = OcheConfig::default();

        play(&config, &path, &args).unwrap();
        assert!(!path.exists());

        args.dry_run = false;
        play(&config, &path, &args).unwrap();
        let stats = open_stats(&path).unwrap();
        assert_eq!(stats.player("ann").map(|p| p.games), Some(1));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn bad_label_is_an_error() {
        let args = PlayArgs {
            mode: "301".into(),
            darts: vec!["X99".into()],
            target: None,
            player: None,
            dry_run: true,
        };
        assert!(play(&OcheConfig::default(), Path::new("unused.json"), &args).is_err());
    }
}
