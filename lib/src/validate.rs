//! Dart validator — decides whether a throw is legal under a mode's rules.
//!
//! Checks run in a fixed order and the first failure wins: range and
//! consistency of the throw itself, then the family rule.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modes::{self, Family, GameMode};
use crate::{GameState, Multiplier, Throw};

/// Why a throw was refused. `Display` is the reason string shown to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no active game")]
    NotPlaying,
    #[error("invalid score")]
    InvalidScore,
    #[error("score does not match segment and multiplier")]
    Inconsistent,
    #[error("must finish on a double")]
    MustFinishOnDouble,
    #[error("bust — score too high")]
    BustTooHigh,
    #[error("bust — 1 point remaining")]
    BustOnePoint,
    #[error("ladder already complete")]
    LadderComplete,
    #[error("wrong order, expected {expected} got {got}")]
    WrongOrder { expected: u8, got: u8 },
    #[error("select a target first")]
    NoTarget,
    #[error("wrong target, expected {expected} got {got}")]
    WrongTarget { expected: u8, got: u8 },
    #[error("select a double first")]
    NoDouble,
    #[error("wrong double, expected D{expected}")]
    WrongDouble { expected: u8, got: u8 },
    #[error("segment {0} is not a target")]
    NotATarget(u8),
    #[error("only {0} hits count")]
    WrongMultiplier(Multiplier),
}

/// Coarse classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The throw itself is malformed.
    InvalidThrow,
    /// The throw is a real dart but breaks the mode's rules.
    RuleViolation,
    /// A countdown throw that overshoots or leaves an unfinishable remainder.
    Bust,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::InvalidScore | Self::Inconsistent => RejectionKind::InvalidThrow,
            Self::BustTooHigh | Self::BustOnePoint => RejectionKind::Bust,
            _ => RejectionKind::RuleViolation,
        }
    }

    pub fn is_bust(&self) -> bool {
        self.kind() == RejectionKind::Bust
    }
}

/// Wire form of a validation result: `{valid, reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub reason: String,
}

impl From<Result<&'static str, Rejection>> for Verdict {
    fn from(result: Result<&'static str, Rejection>) -> Self {
        match result {
            Ok(reason) => Verdict {
                valid: true,
                reason: reason.into(),
            },
            Err(rejection) => Verdict {
                valid: false,
                reason: rejection.to_string(),
            },
        }
    }
}

/// Validate by mode id. Unknown ids validate against the default mode.
pub fn validate_throw(mode_id: &str, state: &GameState, throw: &Throw) -> Verdict {
    check(modes::get_mode(mode_id), state, throw).into()
}

/// Typed validation. `Ok` carries the acceptance reason.
///
/// Does not look at `state.is_playing`; that gate belongs to the caller
/// driving the game (see `GameState::throw_dart`).
pub fn check(
    mode: &GameMode,
    state: &GameState,
    throw: &Throw,
) -> Result<&'static str, Rejection> {
    if !throw.score_in_range() {
        return Err(Rejection::InvalidScore);
    }
    if !throw.is_consistent() {
        return Err(Rejection::Inconsistent);
    }

    let rules = &mode.rules;
    let progress = &state.progress;
    match mode.family {
        Family::Countdown | Family::CountdownLadder => {
            check_countdown(rules.double_out, state.current_score, throw)
        }
        Family::Ladder => {
            let Some(&expected) = rules.sequence.get(progress.current_step) else {
                return Err(Rejection::LadderComplete);
            };
            if throw.segment != expected {
                return Err(Rejection::WrongOrder {
                    expected,
                    got: throw.segment,
                });
            }
            Ok("valid ladder throw")
        }
        Family::TargetFocus => {
            let expected = progress.selected_target.ok_or(Rejection::NoTarget)?;
            if throw.segment != expected {
                return Err(Rejection::WrongTarget {
                    expected,
                    got: throw.segment,
                });
            }
            Ok("valid target focus throw")
        }
        Family::DoubleFinish => {
            let expected = progress.selected_target.ok_or(Rejection::NoDouble)?;
            if throw.segment != expected {
                return Err(Rejection::WrongDouble {
                    expected,
                    got: throw.segment,
                });
            }
            if throw.multiplier != Multiplier::Double {
                return Err(Rejection::WrongMultiplier(Multiplier::Double));
            }
            Ok("valid double finish throw")
        }
        Family::Restricted => {
            if !rules.targets.contains(&throw.segment) {
                return Err(Rejection::NotATarget(throw.segment));
            }
            if let Some(required) = rules.required_multiplier
                && throw.multiplier != required
            {
                return Err(Rejection::WrongMultiplier(required));
            }
            Ok("valid restricted throw")
        }
        Family::Free => Ok("standard validation"),
    }
}

fn check_countdown(
    double_out: bool,
    current: u32,
    throw: &Throw,
) -> Result<&'static str, Rejection> {
    let remaining = i64::from(current) - i64::from(throw.score);

    if remaining == 0 && double_out && !throw.counts_as_double_finish() {
        return Err(Rejection::MustFinishOnDouble);
    }
    if remaining < 0 {
        return Err(Rejection::BustTooHigh);
    }
    // 1 cannot be finished on a double; without double out it is a normal remainder
    if remaining == 1 && double_out {
        return Err(Rejection::BustOnePoint);
    }
    Ok("valid throw")
}
