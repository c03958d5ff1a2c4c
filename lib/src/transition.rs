//! Score transition — advances a game after the validator has ruled.
//!
//! `apply_throw` runs only for accepted throws and never busts on its own.
//! Busts are decided by the validator; `apply_bust` fires the mode's bust
//! hook for them. Neither function touches `dart_history`.

use serde::{Deserialize, Serialize};

use crate::modes::{Family, GameMode};
use crate::{GameState, Throw, checkout};

/// Lowest target of the countdown ladder; busts never retreat below it.
const LADDER_FLOOR: u32 = 123;

/// Notable outcome of a single dart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// Remaining score reached zero (or a qualifying double was hit).
    Checkout,
    Bust,
    /// Correct ladder segment, more to go.
    LadderAdvance,
    /// The program's goal is reached.
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub new_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<Terminal>,
    /// Suggested finish for the new remaining score, countdown modes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_suggestion: Option<Vec<String>>,
}

/// Advance `state` by an accepted throw.
pub fn apply_throw(mode: &GameMode, state: &mut GameState, throw: &Throw) -> Transition {
    let rules = &mode.rules;
    let scored = throw.score.max(0) as u32;

    let terminal = match mode.family {
        Family::Countdown => {
            state.current_score = state.current_score.saturating_sub(scored);
            if state.current_score == 0 {
                state.progress.checkouts += 1;
                if rules.auto_reset {
                    state.current_score = rules.reset_score.unwrap_or(mode.start_score);
                } else if rules.repeat_on_checkout {
                    state.current_score = mode.start_score;
                } else {
                    state.is_playing = false;
                }
                Some(Terminal::Checkout)
            } else {
                None
            }
        }
        Family::CountdownLadder => {
            let progress = &mut state.progress;
            progress.stage_darts += 1;
            let target = progress.current_target.unwrap_or(mode.start_score);
            state.current_score = state.current_score.saturating_sub(scored);

            if state.current_score == 0 {
                let raised = target + rules.increment_on_checkout.unwrap_or(1);
                let next = rules.max_target.map_or(raised, |max| raised.min(max));
                progress.checkouts += 1;
                progress.current_target = Some(next);
                progress.stage_darts = 0;
                state.current_score = next;
                Some(Terminal::Checkout)
            } else if rules.max_darts.is_some_and(|max| progress.stage_darts >= max) {
                // stage used up without a finish
                retreat(mode, state);
                Some(Terminal::Bust)
            } else {
                None
            }
        }
        Family::Ladder => {
            state.progress.current_step += 1;
            state.current_score += 1;
            if state.progress.current_step >= rules.sequence.len() {
                state.is_playing = false;
                Some(Terminal::Complete)
            } else {
                Some(Terminal::LadderAdvance)
            }
        }
        Family::TargetFocus | Family::Restricted => {
            state.progress.hits += 1;
            state.current_score = state.progress.hits;
            if rules.goal.is_some_and(|goal| state.progress.hits >= goal) {
                state.is_playing = false;
                Some(Terminal::Complete)
            } else {
                None
            }
        }
        Family::DoubleFinish => {
            state.progress.hits += 1;
            state.progress.checkouts += 1;
            state.current_score = mode.start_score;
            if !rules.repeat_on_checkout {
                state.is_playing = false;
            }
            Some(Terminal::Checkout)
        }
        Family::Free => {
            state.current_score += scored;
            None
        }
    };

    Transition {
        new_score: state.current_score,
        terminal,
        checkout_suggestion: suggestion(mode, state),
    }
}

/// Fire the bust hook for a throw the validator rejected as a bust.
pub fn apply_bust(mode: &GameMode, state: &mut GameState) -> Transition {
    state.progress.busts += 1;
    if mode.rules.bust_reset {
        state.current_score = mode.rules.reset_score.unwrap_or(mode.start_score);
    }
    if mode.family == Family::CountdownLadder {
        retreat(mode, state);
    }

    Transition {
        new_score: state.current_score,
        terminal: Some(Terminal::Bust),
        checkout_suggestion: suggestion(mode, state),
    }
}

/// Countdown ladder miss: step the target down once it is above the floor
/// and restart the stage at the target.
fn retreat(mode: &GameMode, state: &mut GameState) {
    let progress = &mut state.progress;
    let target = progress.current_target.unwrap_or(mode.start_score);
    let next = if target > LADDER_FLOOR {
        target - 1
    } else {
        target
    };
    progress.current_target = Some(next);
    progress.stage_darts = 0;
    state.current_score = next;
}

fn suggestion(mode: &GameMode, state: &GameState) -> Option<Vec<String>> {
    if !mode.is_countdown() || !state.is_playing {
        return None;
    }
    checkout::lookup(state.current_score)
        .map(|finish| finish.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes;

    fn start(id: &str) -> (&'static GameMode, GameState) {
        let mode = modes::find(id).unwrap();
        (mode, GameState::for_mode(mode))
    }

    #[test]
    fn countdown_subtracts_and_suggests_a_finish() {
        let (mode, mut state) = start("501");
        state.current_score = 200;
        let t = apply_throw(mode, &mut state, &Throw::triple(20));
        assert_eq!(t.new_score, 140);
        assert_eq!(t.terminal, None);
        assert_eq!(
            t.checkout_suggestion,
            Some(vec!["T20".to_string(), "T20".into(), "D10".into()])
        );
    }

    #[test]
    fn plain_checkout_ends_the_game() {
        let (mode, mut state) = start("301");
        state.current_score = 40;
        let t = apply_throw(mode, &mut state, &Throw::double(20));
        assert_eq!(t.terminal, Some(Terminal::Checkout));
        assert_eq!(t.new_score, 0);
        assert!(!state.is_playing);
        assert_eq!(t.checkout_suggestion, None);
    }

    #[test]
    fn auto_reset_restarts_at_reset_score() {
        let (mode, mut state) = start("170-checkout-p5");
        state.current_score = 40;
        let t = apply_throw(mode, &mut state, &Throw::double(20));
        assert_eq!(t.terminal, Some(Terminal::Checkout));
        assert_eq!(t.new_score, 170);
        assert!(state.is_playing);
        assert_eq!(state.progress.checkouts, 1);
    }

    #[test]
    fn bust_reset_returns_to_reset_score() {
        let (mode, mut state) = start("53-checkout-programm3");
        state.current_score = 10;
        let t = apply_bust(mode, &mut state);
        assert_eq!(t.terminal, Some(Terminal::Bust));
        assert_eq!(t.new_score, 53);
        assert_eq!(state.progress.busts, 1);
    }

    #[test]
    fn plain_bust_leaves_score_alone() {
        let (mode, mut state) = start("501");
        state.current_score = 3;
        let t = apply_bust(mode, &mut state);
        assert_eq!(t.new_score, 3);
    }

    #[test]
    fn ladder_advances_then_completes() {
        let (mode, mut state) = start("leiter-123");
        assert_eq!(
            apply_throw(mode, &mut state, &Throw::single(1)).terminal,
            Some(Terminal::LadderAdvance)
        );
        apply_throw(mode, &mut state, &Throw::single(2));
        let t = apply_throw(mode, &mut state, &Throw::double(3));
        assert_eq!(t.terminal, Some(Terminal::Complete));
        assert_eq!(t.new_score, 3);
        assert!(!state.is_playing);
    }

    #[test]
    fn countdown_ladder_climbs_and_caps() {
        let (mode, mut state) = start("123-leiter-p4");
        state.progress.current_target = Some(200);
        state.current_score = 40;
        let t = apply_throw(mode, &mut state, &Throw::double(20));
        assert_eq!(t.terminal, Some(Terminal::Checkout));
        assert_eq!(state.progress.current_target, Some(200));
        assert_eq!(t.new_score, 200);
    }

    #[test]
    fn countdown_ladder_bust_retreats_to_floor() {
        let (mode, mut state) = start("123-leiter-p4");
        state.progress.current_target = Some(124);
        state.current_score = 30;
        apply_bust(mode, &mut state);
        assert_eq!(state.progress.current_target, Some(123));
        assert_eq!(state.current_score, 123);

        apply_bust(mode, &mut state);
        assert_eq!(state.progress.current_target, Some(123));
    }

    #[test]
    fn countdown_ladder_ninth_dart_without_finish_is_a_miss() {
        let (mode, mut state) = start("123-leiter-p4");
        state.progress.current_target = Some(130);
        state.current_score = 130;
        for _ in 0..8 {
            assert_eq!(apply_throw(mode, &mut state, &Throw::miss()).terminal, None);
        }
        let t = apply_throw(mode, &mut state, &Throw::miss());
        assert_eq!(t.terminal, Some(Terminal::Bust));
        assert_eq!(state.progress.current_target, Some(129));
        assert_eq!(t.new_score, 129);
        assert_eq!(state.progress.stage_darts, 0);
    }

    #[test]
    fn double_finish_repeats_on_same_double() {
        let (mode, mut state) = start("double-finish-programm2");
        state.progress.selected_target = Some(8);
        for n in 1..=3 {
            let t = apply_throw(mode, &mut state, &Throw::double(8));
            assert_eq!(t.terminal, Some(Terminal::Checkout));
            assert_eq!(t.new_score, 0);
            assert_eq!(state.progress.checkouts, n);
        }
        assert!(state.is_playing);
        assert_eq!(state.progress.selected_target, Some(8));
    }

    #[test]
    fn restricted_completes_at_goal() {
        let (mode, mut state) = start("single-20-17");
        for _ in 0..9 {
            assert_eq!(apply_throw(mode, &mut state, &Throw::single(18)).terminal, None);
        }
        let t = apply_throw(mode, &mut state, &Throw::single(17));
        assert_eq!(t.terminal, Some(Terminal::Complete));
        assert_eq!(t.new_score, 10);
    }

    #[test]
    fn free_mode_accumulates() {
        let (mode, mut state) = start("practice");
        apply_throw(mode, &mut state, &Throw::triple(20));
        let t = apply_throw(mode, &mut state, &Throw::outer_bull());
        assert_eq!(t.new_score, 85);
        assert_eq!(t.checkout_suggestion, None);
    }
}
