//! `oche run`: a live session on the bus.
//!
//! Starts the session actor, the statistics recorder and every configured
//! simulator, sends `Start`, and follows the bus until the game has been
//! recorded (or ctrl-c stops it).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::broadcast;

use crate::actors::{self, Actor};
use crate::bus::BusSender;
use crate::commands::{pick_target, render_outcome};
use crate::state::SystemState;
use crate::state::config::{OcheConfig, statistics_path};
use oche::{AlertLevel, DartEvent, DartMessage, GameCommand, modes};

/// How long to wait for the recorder after an interrupt.
const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct RunOptions {
    pub mode: Option<String>,
    pub darts: Option<u32>,
    pub target: Option<u8>,
}

pub fn run(config_path: PathBuf, config: OcheConfig, options: RunOptions) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    // Single unified bus
    let (bus_tx, _) = broadcast::channel::<DartMessage>(1024);

    let player = config.player.clone();
    let (system_state, game_writer) = SystemState::new(config_path, config);
    let state = Arc::new(system_state);

    // Session actor must be polling before anything can send it commands.
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new("session".into(), bus_tx.clone(), Arc::clone(&shutdown));
        let receiver = sender.subscribe();
        let (actor, ready_rx) = actors::session::SessionActor::new(
            game_writer,
            player,
            options.darts,
        );
        actor.start(Arc::clone(&state), sender, receiver)?;
        ready_rx
            .recv()
            .map_err(|_| anyhow!("session actor failed to start"))?;
        state.register_actor("session".into(), Box::new(actor), shutdown);
    }

    let snap = state.system.config();
    tracing::debug!("config from {}", state.system.path().display());
    tracing::info!("board '{}' ({})", snap.board.name, snap.board.id);

    let stats_path = statistics_path(snap);
    tracing::info!("recording statistics to {}", stats_path.display());
    actors::start_actor(
        "recorder".into(),
        Box::new(actors::recorder::RecorderActor { path: stats_path }),
        &state,
        &bus_tx,
    )?;

    let simulators = actors::resolve_actors(snap);
    if simulators.is_empty() {
        tracing::warn!("no [simulator] sections configured, waiting for board input");
    }
    for ra in simulators {
        tracing::info!("starting actor '{}' ({})", ra.id, ra.name);
        actors::start_actor(ra.id, ra.actor, &state, &bus_tx)?;
    }

    // Subscribe before Start so the first snapshot is seen.
    let rx = bus_tx.subscribe();
    let cli = BusSender::new("cli".into(), bus_tx.clone(), Arc::new(AtomicBool::new(false)));

    let mode_id = options
        .mode
        .unwrap_or_else(|| snap.game.default_mode.clone());
    let target = pick_target(
        modes::get_mode(&mode_id),
        options.target,
        snap.game.default_target,
    );
    cli.send(DartMessage::new(GameCommand::Start {
        mode: mode_id,
        target,
    }));

    let result = rt.block_on(follow(rx, &cli));

    tracing::info!("shutting down...");
    for id in state.actor_ids() {
        state.stop_actor(&id);
    }
    drop(bus_tx);

    result
}

async fn follow(mut rx: broadcast::Receiver<DartMessage>, cli: &BusSender) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut deadline: Option<tokio::time::Instant> = None;
    let mut follower = Follower::default();

    loop {
        let grace_at = deadline;
        let grace = async move {
            match grace_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            res = &mut ctrl_c, if deadline.is_none() => {
                res?;
                tracing::info!("interrupted, stopping game");
                cli.send(DartMessage::new(GameCommand::Stop));
                deadline = Some(tokio::time::Instant::now() + STOP_GRACE);
            }
            _ = grace => {
                tracing::warn!("recorder did not acknowledge in time");
                return Ok(());
            }
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    if follower.observe(&msg.event) {
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("cli subscriber lagged, dropped {n} events");
                }
            },
        }
    }
}

/// Prints game progress and decides when the session is over.
#[derive(Default)]
struct Follower {
    started: bool,
    awaiting_ack: bool,
}

impl Follower {
    /// Returns true once nothing more is expected on the bus.
    fn observe(&mut self, event: &DartEvent) -> bool {
        match event {
            DartEvent::ThrowResult(result) => {
                println!("{}", render_outcome(&result.throw, &result.outcome));
            }
            DartEvent::GameStateSnapshot(game) => match game.mode() {
                Some(mode) if !self.started => {
                    self.started = true;
                    match game.progress.selected_target {
                        Some(target) => println!("{} (target {target})", mode.name),
                        None => println!("{}", mode.name),
                    }
                }
                None if self.started && !self.awaiting_ack => return true,
                _ => {}
            },
            DartEvent::GameFinished(record) => {
                self.awaiting_ack = true;
                let accuracy = record.players.first().map_or(0.0, |p| p.accuracy);
                println!(
                    "game over: {} darts, accuracy {:.1}%{}",
                    record.total_darts,
                    accuracy * 100.0,
                    if record.winner.is_some() { ", won" } else { "" }
                );
            }
            DartEvent::StatisticsSaved(saved) => {
                if saved.persisted {
                    println!("recorded game {}", saved.game_id);
                } else {
                    println!("game {} not saved", saved.game_id);
                }
                return true;
            }
            DartEvent::Alert(alert) => match alert.level {
                AlertLevel::Warn => eprintln!("warning: {}", alert.message),
                AlertLevel::Error => eprintln!("error: {}", alert.message),
            },
            _ => {}
        }
        false
    }
}
