//! Unified `DartMessage` bus types.
//!
//! All events flow through a single `broadcast<DartMessage>` channel.
//! Each message has a source (global ID of the originator), timestamp and
//! a typed event. Producers create messages; consumers subscribe and filter.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::statistics::GameRecord;
use crate::{GameState, ThrowOutcome, Throw};

// ---------------------------------------------------------------------------
// Top-level message
// ---------------------------------------------------------------------------

/// A single event on the unified bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DartMessage {
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: DartEvent,
}

impl DartMessage {
    /// Create a new message with the current UTC timestamp. Use `.source()`
    /// to attach the originator.
    pub fn new(event: impl Into<DartEvent>) -> Self {
        Self {
            source: String::new(),
            timestamp: Utc::now(),
            event: event.into(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

// ---------------------------------------------------------------------------
// From impls — inner event types -> DartEvent
// ---------------------------------------------------------------------------

impl From<ThrowDetected> for DartEvent {
    fn from(detected: ThrowDetected) -> Self {
        DartEvent::ThrowDetected(detected)
    }
}

impl From<GameCommand> for DartEvent {
    fn from(command: GameCommand) -> Self {
        DartEvent::GameCommand(command)
    }
}

impl From<ThrowResult> for DartEvent {
    fn from(result: ThrowResult) -> Self {
        DartEvent::ThrowResult(result)
    }
}

impl From<GameState> for DartEvent {
    fn from(state: GameState) -> Self {
        DartEvent::GameStateSnapshot(Box::new(state))
    }
}

impl From<GameRecord> for DartEvent {
    fn from(record: GameRecord) -> Self {
        DartEvent::GameFinished(Box::new(record))
    }
}

impl From<StatisticsSaved> for DartEvent {
    fn from(saved: StatisticsSaved) -> Self {
        DartEvent::StatisticsSaved(saved)
    }
}

impl From<ActorState> for DartEvent {
    fn from(state: ActorState) -> Self {
        DartEvent::ActorStatus(state)
    }
}

impl From<AlertMessage> for DartEvent {
    fn from(alert: AlertMessage) -> Self {
        DartEvent::Alert(alert)
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// The typed event payload carried by a `DartMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DartEvent {
    /// A dart landed on a board (real or simulated).
    ThrowDetected(ThrowDetected),
    /// Game control request.
    GameCommand(GameCommand),
    /// Engine verdict for a detected throw (emitted by the session).
    ThrowResult(ThrowResult),
    /// Full game state after every change.
    GameStateSnapshot(Box<GameState>),
    /// A game ended and produced a record.
    GameFinished(Box<GameRecord>),
    /// The recorder processed a finished game.
    StatisticsSaved(StatisticsSaved),
    /// Generic actor status update.
    ActorStatus(ActorState),
    /// Alert for user-visible warn/error conditions.
    Alert(AlertMessage),
}

// ---------------------------------------------------------------------------
// Throws
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowDetected {
    pub throw: Throw,
    /// Produced by a simulator rather than a real board.
    #[serde(default)]
    pub simulated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowResult {
    pub throw: Throw,
    pub outcome: ThrowOutcome,
}

// ---------------------------------------------------------------------------
// GameCommand — start/stop/select/undo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    /// Start a new game. Unknown mode ids start the default mode.
    Start {
        mode: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<u8>,
    },
    /// End the running game, recording it if any dart was thrown.
    Stop,
    SelectTarget { target: u8 },
    UndoLastDart,
}

// ---------------------------------------------------------------------------
// StatisticsSaved — recorder acknowledgment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSaved {
    pub game_id: Uuid,
    /// False when the store write failed; the game is then only in memory.
    pub persisted: bool,
}

// ---------------------------------------------------------------------------
// Actor status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Running,
    Stopped,
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Actor state emitted on the bus: lifecycle status plus key/value telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

impl ActorState {
    pub fn new(status: ActorStatus, telemetry: HashMap<String, String>) -> Self {
        Self { status, telemetry }
    }
}

// ---------------------------------------------------------------------------
// AlertMessage — user-visible warn/error notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warn => write!(f, "warn"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible alert. Info/debug/trace stays in the tracing backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_kind() {
        let msg = DartMessage::new(ThrowDetected {
            throw: Throw::triple(20),
            simulated: true,
        })
        .source("sim.0");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["source"], "sim.0");
        assert_eq!(json["event"]["kind"], "throw_detected");
        assert_eq!(json["event"]["throw"]["score"], 60);
    }

    #[test]
    fn commands_round_trip() {
        let json = r#"{
            "source": "cli",
            "timestamp": "2026-01-01T00:00:00Z",
            "event": {
                "kind": "game_command",
                "type": "start",
                "mode": "target-focus-programm1",
                "target": 19
            }
        }"#;
        let msg: DartMessage = serde_json::from_str(json).unwrap();
        match msg.event {
            DartEvent::GameCommand(GameCommand::Start { mode, target }) => {
                assert_eq!(mode, "target-focus-programm1");
                assert_eq!(target, Some(19));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
