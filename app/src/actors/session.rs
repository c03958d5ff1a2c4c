//! Session actor: owns the running game.
//!
//! Holds the sole `LiveGameWriter`. Every game mutation arrives as a bus
//! event (`GameCommand` or `ThrowDetected`) and is answered with a
//! `ThrowResult` and/or a fresh `GameStateSnapshot`. Finished games are
//! published as `GameFinished` for the recorder.

use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::{LiveGameWriter, SystemState};
use oche::modes;
use oche::{
    ActorState, ActorStatus, AlertLevel, AlertMessage, DartEvent, DartMessage, GameCommand,
    GameState, PlayerSection, Throw, ThrowResult,
};

const POLL_IDLE: Duration = Duration::from_millis(20);

/// Session actor. Always-on, not config-driven.
pub struct SessionActor {
    writer: Mutex<Option<LiveGameWriter>>,
    player: PlayerSection,
    dart_limit: Option<u32>,
    ready_tx: Mutex<Option<std_mpsc::SyncSender<()>>>,
}

impl SessionActor {
    /// `dart_limit` ends the game after that many darts, win or not.
    pub fn new(
        writer: LiveGameWriter,
        player: PlayerSection,
        dart_limit: Option<u32>,
    ) -> (Self, std_mpsc::Receiver<()>) {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(0);
        let actor = Self {
            writer: Mutex::new(Some(writer)),
            player,
            dart_limit,
            ready_tx: Mutex::new(Some(ready_tx)),
        };
        (actor, ready_rx)
    }
}

impl Actor for SessionActor {
    fn start(
        &self,
        _state: Arc<SystemState>,
        sender: BusSender,
        receiver: BusReceiver,
    ) -> anyhow::Result<()> {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("SessionActor::start() called more than once")?;
        let ready_tx = self
            .ready_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("SessionActor::start() called more than once")?;

        let session = Session {
            writer,
            player: self.player.clone(),
            dart_limit: self.dart_limit,
            sender,
        };
        std::thread::Builder::new()
            .name("session".into())
            .spawn(move || run(session, receiver, ready_tx))
            .context("failed to spawn session thread")?;
        Ok(())
    }
}

fn run(session: Session, mut receiver: BusReceiver, ready_tx: std_mpsc::SyncSender<()>) {
    // Signal main thread that we're up and polling.
    let _ = ready_tx.send(());
    drop(ready_tx);
    session.status(ActorStatus::Running);

    loop {
        match receiver.next(POLL_IDLE) {
            Err(PollError::Shutdown) => break,
            Ok(None) => {}
            Ok(Some(msg)) => session.handle(msg.event),
        }
    }

    session.status(ActorStatus::Stopped);
    tracing::info!("session: stopped");
}

/// Event handling, separate from the thread so it can be driven directly.
struct Session {
    writer: LiveGameWriter,
    player: PlayerSection,
    dart_limit: Option<u32>,
    sender: BusSender,
}

impl Session {
    fn handle(&self, event: DartEvent) {
        match event {
            DartEvent::GameCommand(cmd) => self.handle_command(cmd),
            DartEvent::ThrowDetected(detected) => self.handle_throw(detected.throw),
            _ => {}
        }
    }

    fn handle_command(&self, cmd: GameCommand) {
        match cmd {
            GameCommand::Start { mode, target } => {
                self.finish();
                let resolved = modes::resolve(&mode);
                if resolved.fell_back {
                    tracing::warn!("session: unknown mode '{mode}', starting {}", resolved.mode.id);
                    self.alert(
                        AlertLevel::Warn,
                        format!("unknown mode '{mode}', starting {}", resolved.mode.id),
                    );
                }
                self.writer
                    .update(|g| *g = GameState::for_mode(resolved.mode));
                tracing::info!("session: started {}", resolved.mode.name);

                if let Some(target) = target {
                    self.select(target);
                } else if resolved.mode.needs_selection() {
                    tracing::info!("session: {} waits for a target", resolved.mode.id);
                }
            }
            GameCommand::Stop => {
                self.finish();
                self.writer.update(GameState::stop);
            }
            GameCommand::SelectTarget { target } => self.select(target),
            GameCommand::UndoLastDart => match self.writer.update(|g| g.undo_last_dart()) {
                Some(record) => tracing::info!("session: undid {}", record.throw),
                None => tracing::debug!("session: nothing to undo"),
            },
        }
        self.publish_state();
    }

    fn handle_throw(&self, throw: Throw) {
        let outcome = self.writer.update(|g| g.throw_dart(throw));
        if outcome.valid {
            tracing::debug!("session: {throw} -> {}", outcome.score);
        } else {
            tracing::info!("session: {throw} rejected: {}", outcome.reason);
        }
        self.sender
            .send(DartMessage::new(ThrowResult { throw, outcome }));

        let state = self.writer.snapshot();
        self.sender.send(DartMessage::new(state.clone()));

        let limit_hit = self
            .dart_limit
            .is_some_and(|limit| state.darts_thrown() >= limit);
        if state.current_mode.is_some() && (!state.is_playing || limit_hit) {
            if limit_hit && state.is_playing {
                tracing::info!("session: dart limit reached");
            }
            self.finish();
            self.writer.update(GameState::stop);
            self.publish_state();
        }
    }

    /// A valid selection restarts the round, so darts already thrown are
    /// published as a finished game first.
    fn select(&self, target: u8) {
        let mut next = self.writer.snapshot();
        if let Err(e) = next.select_target(target) {
            tracing::warn!("session: {e}");
            self.alert(AlertLevel::Error, e.to_string());
            return;
        }
        self.finish();
        self.writer.update(|g| *g = next);
    }

    /// Publish the running game as `GameFinished`, if any dart was thrown.
    fn finish(&self) {
        let record = self
            .writer
            .update(|g| g.to_record(&self.player.id, &self.player.name, Utc::now()));
        if let Some(record) = record {
            tracing::info!(
                "session: finished {} after {} darts",
                record.mode,
                record.total_darts
            );
            self.sender.send(DartMessage::new(record));
        }
    }

    fn publish_state(&self) {
        self.sender.send(DartMessage::new(self.writer.snapshot()));
    }

    fn alert(&self, level: AlertLevel, message: String) {
        self.sender
            .send(DartMessage::new(AlertMessage { level, message }));
    }

    fn status(&self, status: ActorStatus) {
        let mut telemetry = HashMap::new();
        telemetry.insert("player".into(), self.player.name.clone());
        if let Some(limit) = self.dart_limit {
            telemetry.insert("dart_limit".into(), limit.to_string());
        }
        self.sender
            .send(DartMessage::new(ActorState::new(status, telemetry)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::broadcast;

    use crate::state::LiveGame;

    fn session(dart_limit: Option<u32>) -> (Session, LiveGame, BusReceiver) {
        let (tx, _) = broadcast::channel(256);
        let sender = BusSender::new("session".into(), tx, Arc::new(AtomicBool::new(false)));
        let receiver = sender.subscribe();
        let (game, writer) = LiveGame::new();
        let session = Session {
            writer,
            player: PlayerSection::default(),
            dart_limit,
            sender,
        };
        (session, game, receiver)
    }

    fn drain(receiver: &mut BusReceiver) -> Vec<DartEvent> {
        let mut events = Vec::new();
        while let Ok(Some(msg)) = receiver.poll() {
            events.push(msg.event);
        }
        events
    }

    fn start(mode: &str, target: Option<u8>) -> GameCommand {
        GameCommand::Start {
            mode: mode.into(),
            target,
        }
    }

    #[test]
    fn start_publishes_fresh_state() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("301", None));
        assert_eq!(game.snapshot().current_score, 301);
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(DartEvent::GameStateSnapshot(s)) if s.is_playing));
    }

    #[test]
    fn unknown_mode_alerts_and_falls_back() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("killer", None));
        assert_eq!(game.snapshot().current_mode.as_deref(), Some("501"));
        assert!(
            drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::Alert(a) if a.level == AlertLevel::Warn))
        );
    }

    #[test]
    fn invalid_target_raises_error_alert() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("double-finish-programm2", Some(21)));
        assert_eq!(game.snapshot().progress.selected_target, None);
        assert!(
            drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::Alert(a) if a.level == AlertLevel::Error))
        );
    }

    #[test]
    fn every_throw_gets_a_result() {
        let (session, _, mut rx) = session(None);
        session.handle_command(start("501", None));
        drain(&mut rx);

        session.handle_throw(Throw::triple(20));
        let events = drain(&mut rx);
        match &events[0] {
            DartEvent::ThrowResult(r) => {
                assert!(r.outcome.valid);
                assert_eq!(r.outcome.score, 441);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(events[1], DartEvent::GameStateSnapshot(_)));
    }

    #[test]
    fn completed_game_is_published_once() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("around-the-clock", None));
        for segment in 1..=20 {
            session.handle_throw(Throw::single(segment));
        }
        session.handle_throw(Throw::outer_bull());

        let finished: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                DartEvent::GameFinished(record) => Some(record),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].mode, "around-the-clock");
        assert_eq!(finished[0].winner.as_deref(), Some("player1"));
        assert!(!game.snapshot().is_playing);

        session.handle_command(GameCommand::Stop);
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::GameFinished(_)))
        );
    }

    #[test]
    fn dart_limit_ends_the_game() {
        let (session, game, mut rx) = session(Some(3));
        session.handle_command(start("501", None));
        for _ in 0..3 {
            session.handle_throw(Throw::single(1));
        }
        let events = drain(&mut rx);
        let record = events.iter().find_map(|e| match e {
            DartEvent::GameFinished(record) => Some(record),
            _ => None,
        });
        assert_eq!(record.map(|r| r.total_darts), Some(3));
        assert_eq!(record.and_then(|r| r.winner.clone()), None);
        assert!(game.snapshot().current_mode.is_none());
    }

    #[test]
    fn restart_records_the_running_game() {
        let (session, _, mut rx) = session(None);
        session.handle_command(start("301", None));
        session.handle_throw(Throw::triple(20));
        session.handle_command(start("501", None));
        assert!(
            drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::GameFinished(r) if r.mode == "301"))
        );
    }

    #[test]
    fn reselect_records_the_previous_round() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("target-focus-programm1", Some(20)));
        for _ in 0..5 {
            session.handle_throw(Throw::triple(20));
        }
        drain(&mut rx);

        session.handle_command(GameCommand::SelectTarget { target: 19 });
        let finished: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                DartEvent::GameFinished(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].total_darts, 5);

        let state = game.snapshot();
        assert_eq!(state.progress.selected_target, Some(19));
        assert!(state.dart_history.is_empty());
    }

    #[test]
    fn rejected_reselect_keeps_the_round() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("target-focus-programm1", Some(20)));
        session.handle_throw(Throw::single(20));
        drain(&mut rx);

        session.handle_command(GameCommand::SelectTarget { target: 5 });
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::GameFinished(_)))
        );
        assert_eq!(game.snapshot().darts_thrown(), 1);
    }

    #[test]
    fn stop_without_darts_records_nothing() {
        let (session, game, mut rx) = session(None);
        session.handle_command(start("301", None));
        session.handle_command(GameCommand::Stop);
        assert!(game.snapshot().current_mode.is_none());
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, DartEvent::GameFinished(_)))
        );
    }

    #[test]
    fn undo_restores_score() {
        let (session, game, _rx) = session(None);
        session.handle_command(start("301", None));
        session.handle_throw(Throw::triple(20));
        session.handle_command(GameCommand::UndoLastDart);
        assert_eq!(game.snapshot().current_score, 301);
    }
}
