//! Statistics recorder: persists every finished game.
//!
//! Listens for `GameFinished`, folds the record into the statistics
//! snapshot, and acknowledges with `StatisticsSaved`. A store that cannot be
//! opened or written never blocks the session: the acknowledgment then
//! carries `persisted: false`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use crate::store::JsonFileStore;
use oche::{
    ActorState, ActorStatus, AlertLevel, AlertMessage, DartEvent, DartMessage, GameRecord,
    Statistics, StatisticsSaved, StatsStore,
};

const POLL_IDLE: Duration = Duration::from_millis(50);

pub struct RecorderActor {
    pub path: PathBuf,
}

impl Actor for RecorderActor {
    fn start(
        &self,
        _state: Arc<SystemState>,
        sender: BusSender,
        receiver: BusReceiver,
    ) -> anyhow::Result<()> {
        let store = JsonFileStore::new(&self.path);
        std::thread::Builder::new()
            .name("recorder".into())
            .spawn(move || run(store, sender, receiver))
            .context("failed to spawn recorder thread")?;
        Ok(())
    }
}

fn run(store: JsonFileStore, sender: BusSender, mut receiver: BusReceiver) {
    let path = store.path().display().to_string();
    let mut recorder = Recorder::open(store, &sender);

    let mut telemetry = HashMap::new();
    telemetry.insert("path".into(), path);
    sender.send(DartMessage::new(ActorState::new(
        ActorStatus::Running,
        telemetry.clone(),
    )));

    loop {
        match receiver.next(POLL_IDLE) {
            Err(PollError::Shutdown) => break,
            Ok(None) => {}
            Ok(Some(msg)) => {
                if let DartEvent::GameFinished(record) = msg.event {
                    recorder.record(*record, &sender);
                }
            }
        }
    }

    sender.send(DartMessage::new(ActorState::new(
        ActorStatus::Stopped,
        telemetry,
    )));
}

/// Statistics handle plus the degraded state when the store is unusable.
struct Recorder<S: StatsStore> {
    stats: Option<Statistics<S>>,
}

impl<S: StatsStore> Recorder<S> {
    fn open(store: S, sender: &BusSender) -> Self {
        match Statistics::open(store) {
            Ok(stats) => {
                tracing::info!(
                    "recorder: {} games on record",
                    stats.snapshot().games.len()
                );
                Self { stats: Some(stats) }
            }
            Err(e) => {
                tracing::warn!("recorder: statistics unavailable: {e}");
                sender.send(DartMessage::new(AlertMessage {
                    level: AlertLevel::Warn,
                    message: format!("statistics unavailable: {e}"),
                }));
                Self { stats: None }
            }
        }
    }

    fn record(&mut self, record: GameRecord, sender: &BusSender) {
        let game_id = record.id;
        let persisted = match self.stats.as_mut() {
            Some(stats) => match stats.record_game(record) {
                Ok(saved) => {
                    tracing::info!("recorder: saved {} ({})", saved.id, saved.mode);
                    true
                }
                Err(e) => {
                    tracing::warn!("recorder: failed to save {game_id}: {e}");
                    false
                }
            },
            None => false,
        };
        sender.send(DartMessage::new(StatisticsSaved { game_id, persisted }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    use chrono::Utc;
    use oche::statistics::MemoryStore;
    use oche::{GameState, Throw};
    use tokio::sync::broadcast;

    fn sender() -> (BusSender, BusReceiver) {
        let (tx, _) = broadcast::channel(16);
        let sender = BusSender::new("recorder".into(), tx, Arc::new(AtomicBool::new(false)));
        let receiver = sender.subscribe();
        (sender, receiver)
    }

    fn finished_game() -> GameRecord {
        let mut game = GameState::new_game("practice");
        game.throw_dart(Throw::triple(20));
        game.to_record("player1", "Player 1", Utc::now()).unwrap()
    }

    fn saved(receiver: &mut BusReceiver) -> Option<StatisticsSaved> {
        while let Ok(Some(msg)) = receiver.poll() {
            if let DartEvent::StatisticsSaved(saved) = msg.event {
                return Some(saved);
            }
        }
        None
    }

    #[test]
    fn acknowledges_persisted_games() {
        let (sender, mut receiver) = sender();
        let mut recorder = Recorder::open(MemoryStore::new(), &sender);
        let record = finished_game();
        let id = record.id;
        recorder.record(record, &sender);

        let ack = saved(&mut receiver).unwrap();
        assert_eq!(ack.game_id, id);
        assert!(ack.persisted);
        let stats = recorder.stats.as_ref().unwrap();
        assert_eq!(stats.store().saved().map(|s| s.games.len()), Some(1));
    }

    #[test]
    fn failed_save_is_acknowledged_as_not_persisted() {
        let (sender, mut receiver) = sender();
        let mut recorder = Recorder::open(MemoryStore::failing(), &sender);
        recorder.record(finished_game(), &sender);

        assert!(!saved(&mut receiver).unwrap().persisted);
        assert!(recorder.stats.as_ref().unwrap().snapshot().games.is_empty());
    }
}
