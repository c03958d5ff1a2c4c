//! Per-game state — score, progress cursors and dart history.
//!
//! A `GameState` is owned by whoever drives the game. It names its mode by
//! id and looks the template up on demand, so the state itself is plain
//! data that serializes as a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modes::{self, Family, GameMode};
use crate::statistics::{GameRecord, PlayerResult};
use crate::transition::{self, Terminal};
use crate::validate::{self, Rejection};
use crate::{Multiplier, Throw};

/// Progress cursors for the running game. Never stored on the mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Index into the ladder sequence.
    pub current_step: usize,
    /// Current stage target of a countdown ladder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_target: Option<u32>,
    /// Segment (or double) the player picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_target: Option<u8>,
    pub hits: u32,
    pub checkouts: u32,
    pub busts: u32,
    /// Darts thrown in the current countdown-ladder stage.
    pub stage_darts: u32,
}

/// One dart as it entered the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DartRecord {
    pub throw: Throw,
    pub timestamp: DateTime<Utc>,
    /// Rejected as a bust; replayed through the bust hook.
    #[serde(default)]
    pub bust: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub current_mode: Option<String>,
    pub current_score: u32,
    pub is_playing: bool,
    pub dart_history: Vec<DartRecord>,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Per-game shooting summary.
///
/// Best and worst consider accepted darts only; the rates are shares of every
/// dart thrown, busts included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub darts: u32,
    pub accepted: u32,
    pub misses: u32,
    pub bulls: u32,
    pub best_dart: u32,
    pub worst_dart: u32,
    pub double_rate: f64,
    pub triple_rate: f64,
    /// `accepted / darts`, 0 before the first dart.
    pub accuracy: f64,
}

/// Result of feeding one dart to a running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowOutcome {
    pub valid: bool,
    pub reason: String,
    /// Score after the dart (unchanged for plain rejections).
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<Terminal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_suggestion: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no active game")]
    NotPlaying,
    #[error("mode {0} has no target selection")]
    NotSelectable(&'static str),
    #[error("segment {target} cannot be selected in {mode}")]
    InvalidTarget { mode: &'static str, target: u8 },
}

impl GameState {
    /// Start a game by id. Unknown ids start the default mode.
    pub fn new_game(mode_id: &str) -> Self {
        Self::for_mode(modes::get_mode(mode_id))
    }

    pub fn for_mode(mode: &GameMode) -> Self {
        Self {
            current_mode: Some(mode.id.to_string()),
            current_score: mode.start_score,
            is_playing: true,
            dart_history: Vec::new(),
            progress: initial_progress(mode, None),
            started_at: Some(Utc::now()),
        }
    }

    /// The mode this game runs, `None` when idle.
    pub fn mode(&self) -> Option<&'static GameMode> {
        self.current_mode.as_deref().map(modes::get_mode)
    }

    /// Pick the target (or double) for modes with selectable targets.
    ///
    /// Picking a target restarts the round: history and counters are cleared.
    pub fn select_target(&mut self, target: u8) -> Result<(), SelectionError> {
        let mode = self.mode().ok_or(SelectionError::NotPlaying)?;
        if !mode.needs_selection() {
            return Err(SelectionError::NotSelectable(mode.id));
        }
        if !mode.rules.selectable_targets.contains(&target) {
            return Err(SelectionError::InvalidTarget {
                mode: mode.id,
                target,
            });
        }
        self.current_score = mode.start_score;
        self.is_playing = true;
        self.dart_history.clear();
        self.progress = initial_progress(mode, Some(target));
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Validate a dart and, if accepted, advance the game.
    ///
    /// Busts are recorded in the history and fire the mode's bust hook; other
    /// rejections leave the state untouched.
    pub fn throw_dart(&mut self, throw: Throw) -> ThrowOutcome {
        self.throw_dart_at(throw, Utc::now())
    }

    pub fn throw_dart_at(&mut self, throw: Throw, timestamp: DateTime<Utc>) -> ThrowOutcome {
        let mode = match self.mode() {
            Some(mode) if self.is_playing => mode,
            _ => return self.rejected(Rejection::NotPlaying),
        };

        match validate::check(mode, self, &throw) {
            Ok(reason) => {
                let t = transition::apply_throw(mode, self, &throw);
                self.dart_history.push(DartRecord {
                    throw,
                    timestamp,
                    bust: false,
                });
                ThrowOutcome {
                    valid: true,
                    reason: reason.to_string(),
                    score: t.new_score,
                    terminal: t.terminal,
                    checkout_suggestion: t.checkout_suggestion,
                }
            }
            Err(rejection) if rejection.is_bust() => {
                let t = transition::apply_bust(mode, self);
                self.dart_history.push(DartRecord {
                    throw,
                    timestamp,
                    bust: true,
                });
                ThrowOutcome {
                    valid: false,
                    reason: rejection.to_string(),
                    score: t.new_score,
                    terminal: t.terminal,
                    checkout_suggestion: t.checkout_suggestion,
                }
            }
            Err(rejection) => self.rejected(rejection),
        }
    }

    fn rejected(&self, rejection: Rejection) -> ThrowOutcome {
        ThrowOutcome {
            valid: false,
            reason: rejection.to_string(),
            score: self.current_score,
            terminal: None,
            checkout_suggestion: None,
        }
    }

    /// Remove the last dart and rebuild the state by replaying the rest.
    pub fn undo_last_dart(&mut self) -> Option<DartRecord> {
        let mode = self.mode()?;
        let undone = self.dart_history.pop()?;
        let history = std::mem::take(&mut self.dart_history);

        self.current_score = mode.start_score;
        self.is_playing = true;
        self.progress = initial_progress(mode, self.progress.selected_target);
        for record in history {
            if record.bust {
                transition::apply_bust(mode, self);
            } else {
                transition::apply_throw(mode, self, &record.throw);
            }
            self.dart_history.push(record);
        }
        Some(undone)
    }

    /// End the game and return to idle.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn darts_thrown(&self) -> u32 {
        self.dart_history.len() as u32
    }

    /// Points scored by accepted darts.
    pub fn points_scored(&self) -> u32 {
        self.dart_history
            .iter()
            .filter(|r| !r.bust)
            .map(|r| r.throw.score.max(0) as u32)
            .sum()
    }

    /// Three-dart average over every dart thrown, busts included.
    pub fn average(&self) -> f64 {
        match self.darts_thrown() {
            0 => 0.0,
            n => f64::from(self.points_scored()) / f64::from(n) * 3.0,
        }
    }

    pub fn summary(&self) -> GameSummary {
        let darts = self.darts_thrown();
        let share = |n: usize| match darts {
            0 => 0.0,
            d => n as f64 / f64::from(d),
        };
        let throws = || self.dart_history.iter().map(|r| r.throw);
        let accepted: Vec<u32> = self
            .dart_history
            .iter()
            .filter(|r| !r.bust)
            .map(|r| r.throw.score.max(0) as u32)
            .collect();

        GameSummary {
            darts,
            accepted: accepted.len() as u32,
            misses: throws().filter(Throw::is_miss).count() as u32,
            bulls: throws().filter(Throw::is_bull).count() as u32,
            best_dart: accepted.iter().copied().max().unwrap_or(0),
            worst_dart: accepted.iter().copied().min().unwrap_or(0),
            double_rate: share(throws().filter(|t| t.multiplier == Multiplier::Double).count()),
            triple_rate: share(throws().filter(|t| t.multiplier == Multiplier::Triple).count()),
            accuracy: share(accepted.len()),
        }
    }

    /// The player finished a checkout or completed the program.
    pub fn is_won(&self) -> bool {
        self.current_mode.is_some() && (self.progress.checkouts > 0 || !self.is_playing)
    }

    pub fn player_result(&self, id: &str, name: &str) -> PlayerResult {
        let summary = self.summary();
        PlayerResult {
            id: id.to_string(),
            name: name.to_string(),
            final_score: self.current_score,
            darts: summary.darts,
            average: self.average(),
            best_score: summary.best_dart,
            worst_score: summary.worst_dart,
            accuracy: summary.accuracy,
            double_rate: summary.double_rate,
            triple_rate: summary.triple_rate,
            checkout: self.progress.checkouts > 0,
        }
    }

    /// Single-player record of this game, `None` when idle or no dart was thrown.
    pub fn to_record(&self, id: &str, name: &str, now: DateTime<Utc>) -> Option<GameRecord> {
        let mode = self.current_mode.as_deref()?;
        if self.dart_history.is_empty() {
            return None;
        }
        let mut record = GameRecord::new(mode, now).player(self.player_result(id, name));
        if self.is_won() {
            record = record.winner(id);
        }
        if let Some(started) = self.started_at {
            record = record.duration_secs((now - started).num_seconds().max(0) as u64);
        }
        Some(record)
    }
}

fn initial_progress(mode: &GameMode, selected_target: Option<u8>) -> Progress {
    Progress {
        current_target: (mode.family == Family::CountdownLadder).then_some(mode.start_score),
        selected_target,
        ..Progress::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_starts_at_mode_start_score() {
        let state = GameState::new_game("301");
        assert_eq!(state.current_score, 301);
        assert!(state.is_playing);
        assert_eq!(state.mode().map(|m| m.id), Some("301"));
    }

    #[test]
    fn unknown_mode_starts_default_game() {
        let state = GameState::new_game("killer");
        assert_eq!(state.current_mode.as_deref(), Some("501"));
        assert_eq!(state.current_score, 501);
    }

    #[test]
    fn idle_state_rejects_throws() {
        let mut state = GameState::default();
        let outcome = state.throw_dart(Throw::triple(20));
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, "no active game");
    }

    #[test]
    fn plain_rejection_is_not_recorded() {
        let mut state = GameState::new_game("leiter-123");
        let outcome = state.throw_dart(Throw::single(3));
        assert!(!outcome.valid);
        assert!(state.dart_history.is_empty());
        assert_eq!(state.progress.current_step, 0);
    }

    #[test]
    fn bust_is_recorded_and_replayed() {
        let mut state = GameState::new_game("53-checkout-programm3");
        state.throw_dart(Throw::single(13));
        assert_eq!(state.current_score, 40);
        let outcome = state.throw_dart(Throw::triple(20));
        assert_eq!(outcome.terminal, Some(Terminal::Bust));
        assert_eq!(outcome.score, 53);
        assert!(state.dart_history[1].bust);

        state.throw_dart(Throw::single(3));
        assert_eq!(state.current_score, 50);
        state.undo_last_dart();
        assert_eq!(state.current_score, 53);
        assert_eq!(state.progress.busts, 1);
    }

    #[test]
    fn undo_restores_previous_state() {
        let mut state = GameState::new_game("leiter-123");
        state.throw_dart(Throw::single(1));
        let before = state.clone();
        state.throw_dart(Throw::triple(2));
        assert_eq!(state.progress.current_step, 2);

        let undone = state.undo_last_dart().unwrap();
        assert_eq!(undone.throw, Throw::triple(2));
        assert_eq!(state, before);
    }

    #[test]
    fn undo_reopens_a_finished_game() {
        let mut state = GameState::new_game("301");
        for label in ["T20", "T20", "T20", "T20", "S1", "S20", "D20"] {
            assert!(state.throw_dart(label.parse().unwrap()).valid, "{label}");
        }
        assert!(!state.is_playing);
        assert_eq!(state.current_score, 0);

        state.undo_last_dart();
        assert!(state.is_playing);
        assert_eq!(state.current_score, 40);
        assert_eq!(state.progress.checkouts, 0);
    }

    #[test]
    fn undo_on_empty_history_is_none() {
        let mut state = GameState::new_game("practice");
        assert!(state.undo_last_dart().is_none());
        assert!(GameState::default().undo_last_dart().is_none());
    }

    #[test]
    fn selection_is_checked_and_restarts_the_round() {
        let mut state = GameState::new_game("target-focus-programm1");
        assert_eq!(
            state.select_target(5),
            Err(SelectionError::InvalidTarget {
                mode: "target-focus-programm1",
                target: 5
            })
        );
        state.select_target(20).unwrap();
        state.throw_dart(Throw::single(20));
        assert_eq!(state.progress.hits, 1);

        state.select_target(19).unwrap();
        assert_eq!(state.progress.hits, 0);
        assert!(state.dart_history.is_empty());
        assert_eq!(state.progress.selected_target, Some(19));

        let mut countdown = GameState::new_game("501");
        assert_eq!(
            countdown.select_target(20),
            Err(SelectionError::NotSelectable("501"))
        );
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut state = GameState::new_game("501");
        state.throw_dart(Throw::triple(20));
        state.stop();
        assert_eq!(state, GameState::default());
        assert!(state.mode().is_none());
    }

    #[test]
    fn average_and_best_score_skip_busts() {
        let mut state = GameState::new_game("501");
        state.current_score = 50;
        state.throw_dart(Throw::single(10));
        state.throw_dart(Throw::triple(20));
        let result = state.player_result("p1", "Pat");
        assert_eq!(result.darts, 2);
        assert_eq!(result.best_score, 10);
        assert!((result.average - 15.0).abs() < f64::EPSILON);
        assert!(!result.checkout);
    }

    #[test]
    fn summary_counts_rings_and_accuracy() {
        let mut state = GameState::new_game("53-checkout-programm3");
        for label in ["S13", "T20", "D20"] {
            state.throw_dart(label.parse().unwrap());
        }
        // S13 accepted, T20 busts back to 53, D20 leaves 33
        let summary = state.summary();
        assert_eq!(summary.darts, 3);
        assert_eq!(summary.accepted, 2);
        assert_eq!((summary.best_dart, summary.worst_dart), (40, 13));
        assert!((summary.accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.double_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((summary.triple_rate - 1.0 / 3.0).abs() < 1e-9);

        let result = state.player_result("p1", "Pat");
        assert_eq!(result.worst_score, 13);
        assert!((result.accuracy - summary.accuracy).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_counts_misses_and_bulls() {
        let mut state = GameState::new_game("practice");
        for throw in [Throw::miss(), Throw::bullseye(), Throw::outer_bull(), Throw::single(1)] {
            state.throw_dart(throw);
        }
        let summary = state.summary();
        assert_eq!((summary.misses, summary.bulls), (1, 2));
        assert_eq!((summary.best_dart, summary.worst_dart), (50, 0));
        assert_eq!(GameState::default().summary(), GameSummary::default());
    }

    #[test]
    fn record_marks_winner_after_checkout() {
        let mut state = GameState::new_game("double-finish-programm2");
        state.select_target(16).unwrap();
        state.throw_dart(Throw::double(16));
        let record = state.to_record("p1", "Pat", Utc::now()).unwrap();
        assert_eq!(record.mode, "double-finish-programm2");
        assert_eq!(record.winner.as_deref(), Some("p1"));
        assert_eq!(record.total_darts, 1);
        assert!(record.players[0].checkout);

        assert!(GameState::new_game("501").to_record("p1", "Pat", Utc::now()).is_none());
    }

    #[test]
    fn snapshot_serializes_history() {
        let mut state = GameState::new_game("501");
        state.throw_dart(Throw::triple(20));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["current_score"], 441);
        assert_eq!(json["dart_history"][0]["throw"]["score"], 60);
        assert_eq!(json["dart_history"][0]["bust"], false);
        let back: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
