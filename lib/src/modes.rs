//! Mode registry — the fixed catalog of classic games and training programs.
//!
//! Mode definitions are `'static` templates. They never hold progress; the
//! step, target and selection cursors of a running game live in
//! `GameState::progress`, so any number of games can share one template.

use serde::Serialize;

use crate::Multiplier;

/// Mode id used when a caller asks for an id that is not in the catalog.
pub const DEFAULT_MODE_ID: &str = "501";

/// Rule family. Validation and scoring dispatch on this tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Count down from `start_score` to exactly zero.
    Countdown,
    /// Countdown whose start score walks up on checkout and down on a miss.
    CountdownLadder,
    /// Hit `rules.sequence` in order.
    Ladder,
    /// Count hits on one selected segment, any ring.
    TargetFocus,
    /// Hit the selected double, then repeat.
    DoubleFinish,
    /// Count hits on `rules.targets` with the required ring.
    Restricted,
    /// Anything goes, every dart adds its score.
    Free,
}

/// Information panels a front end should show for the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Checkout,
    Average,
    Progress,
    Time,
    Targets,
    Hits,
    Doubles,
    Accuracy,
    Remaining,
}

/// Declarative rule set. Only the fields relevant to a mode's family are set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rules {
    pub double_in: bool,
    pub double_out: bool,
    /// Darts per turn, or per stage/session for programs that say so.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_darts: Option<u32>,
    /// On bust, return to `reset_score`.
    pub bust_reset: bool,
    /// On checkout, return to `reset_score`.
    pub auto_reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_score: Option<u32>,
    /// On checkout, restart at `start_score` keeping the selected target.
    pub repeat_on_checkout: bool,
    /// Targets the player picks from before the first dart.
    #[serde(skip_serializing_if = "is_empty")]
    pub selectable_targets: &'static [u8],
    /// Required hit order for ladders.
    #[serde(skip_serializing_if = "is_empty")]
    pub sequence: &'static [u8],
    /// Segments that count for restricted drills.
    #[serde(skip_serializing_if = "is_empty")]
    pub targets: &'static [u8],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_target: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_on_checkout: Option<u32>,
    /// `Single` for singles-only drills, `Double` for doubles-only drills.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_multiplier: Option<Multiplier>,
    /// Hits (or checkouts) that complete the program.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<u32>,
    pub training_mode: bool,
    #[serde(skip_serializing_if = "is_empty")]
    pub panels: &'static [Panel],
}

fn is_empty<T>(s: &&[T]) -> bool {
    s.is_empty()
}

impl Rules {
    /// All flags off, nothing selectable.
    pub const NONE: Rules = Rules {
        double_in: false,
        double_out: false,
        max_darts: None,
        bust_reset: false,
        auto_reset: false,
        reset_score: None,
        repeat_on_checkout: false,
        selectable_targets: &[],
        sequence: &[],
        targets: &[],
        max_target: None,
        increment_on_checkout: None,
        required_multiplier: None,
        goal: None,
        training_mode: false,
        panels: &[],
    };
}

/// Immutable mode definition.
#[derive(Debug, PartialEq, Serialize)]
pub struct GameMode {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub start_score: u32,
    pub family: Family,
    pub rules: Rules,
}

impl GameMode {
    /// Countdown-style scoring (remaining points rather than a hit count).
    pub fn is_countdown(&self) -> bool {
        matches!(self.family, Family::Countdown | Family::CountdownLadder)
    }

    /// The player must pick a target before the first dart.
    pub fn needs_selection(&self) -> bool {
        !self.rules.selectable_targets.is_empty()
    }
}

const ALL_SEGMENTS: &[u8] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 25,
];

const HIGH_TREBLE_BEDS: &[u8] = &[20, 19, 18, 17];

const CRICKET_BEDS: &[u8] = &[20, 19, 18, 17, 16, 15, 25];

const COUNTDOWN_PANELS: &[Panel] = &[Panel::Checkout, Panel::Average];

static MODES: &[GameMode] = &[
    GameMode {
        id: "501",
        name: "501",
        description: "Classic 501, double out",
        start_score: 501,
        family: Family::Countdown,
        rules: Rules {
            double_out: true,
            max_darts: Some(3),
            ..Rules::NONE
        },
    },
    GameMode {
        id: "301",
        name: "301",
        description: "Quick 301, double out",
        start_score: 301,
        family: Family::Countdown,
        rules: Rules {
            double_out: true,
            max_darts: Some(3),
            ..Rules::NONE
        },
    },
    GameMode {
        id: "cricket",
        name: "Cricket",
        description: "15 through 20 and the bull, three marks each",
        start_score: 0,
        family: Family::Restricted,
        rules: Rules {
            targets: CRICKET_BEDS,
            // three marks on each bed, no points scoring
            goal: Some(21),
            max_darts: Some(3),
            panels: &[Panel::Targets, Panel::Hits],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "around-the-clock",
        name: "Around the Clock",
        description: "Hit 1 through 20 in order, then the bull",
        start_score: 0,
        family: Family::Ladder,
        rules: Rules {
            sequence: ALL_SEGMENTS,
            max_darts: Some(3),
            panels: &[Panel::Progress],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "practice",
        name: "Practice",
        description: "Free practice, every dart adds its score",
        start_score: 0,
        family: Family::Free,
        rules: Rules {
            max_darts: Some(3),
            ..Rules::NONE
        },
    },
    GameMode {
        id: "501-double-out",
        name: "501 Double Out",
        description: "501 training game, must finish on a double",
        start_score: 501,
        family: Family::Countdown,
        rules: Rules {
            double_out: true,
            max_darts: Some(3),
            training_mode: true,
            panels: COUNTDOWN_PANELS,
            ..Rules::NONE
        },
    },
    GameMode {
        id: "leiter-123",
        name: "Ladder 1-2-3",
        description: "Hit segments 1, 2 and 3 in order",
        start_score: 0,
        family: Family::Ladder,
        rules: Rules {
            sequence: &[1, 2, 3],
            max_darts: Some(3),
            training_mode: true,
            panels: &[Panel::Progress, Panel::Time],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "single-20-17",
        name: "Single 20-17",
        description: "Single beds of 20, 19, 18 and 17 only",
        start_score: 0,
        family: Family::Restricted,
        rules: Rules {
            targets: HIGH_TREBLE_BEDS,
            required_multiplier: Some(Multiplier::Single),
            goal: Some(10),
            max_darts: Some(3),
            training_mode: true,
            panels: &[Panel::Targets, Panel::Hits],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "alle-double",
        name: "All Doubles",
        description: "Doubles only, any segment including the bull",
        start_score: 0,
        family: Family::Restricted,
        rules: Rules {
            targets: ALL_SEGMENTS,
            required_multiplier: Some(Multiplier::Double),
            goal: Some(21),
            max_darts: Some(3),
            training_mode: true,
            panels: &[Panel::Doubles, Panel::Accuracy],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "170-checkout-p5",
        name: "170 Checkout (P5)",
        description: "Fixed start at 170, double out, resets to 170 after every checkout",
        start_score: 170,
        family: Family::Countdown,
        rules: Rules {
            double_out: true,
            max_darts: Some(3),
            auto_reset: true,
            reset_score: Some(170),
            training_mode: true,
            panels: COUNTDOWN_PANELS,
            ..Rules::NONE
        },
    },
    GameMode {
        id: "123-leiter-p4",
        name: "123 Ladder (P4)",
        description: "Start at 123, double out, nine darts per stage; a checkout raises the target",
        start_score: 123,
        family: Family::CountdownLadder,
        rules: Rules {
            double_out: true,
            max_darts: Some(9),
            max_target: Some(200),
            increment_on_checkout: Some(1),
            training_mode: true,
            panels: COUNTDOWN_PANELS,
            ..Rules::NONE
        },
    },
    GameMode {
        id: "target-focus-programm1",
        name: "Target Focus (P1)",
        description: "30 darts at a chosen bed: 20, 19, 18 or 17",
        start_score: 0,
        family: Family::TargetFocus,
        rules: Rules {
            selectable_targets: HIGH_TREBLE_BEDS,
            goal: Some(30),
            max_darts: Some(30),
            training_mode: true,
            panels: &[Panel::Hits, Panel::Accuracy, Panel::Remaining],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "double-finish-programm2",
        name: "Double Finish Routine (P2)",
        description: "Pick any double; after each checkout play the same double again",
        start_score: 0,
        family: Family::DoubleFinish,
        rules: Rules {
            selectable_targets: ALL_SEGMENTS,
            goal: Some(1),
            max_darts: Some(3),
            repeat_on_checkout: true,
            training_mode: true,
            panels: &[Panel::Doubles, Panel::Accuracy],
            ..Rules::NONE
        },
    },
    GameMode {
        id: "53-checkout-programm3",
        name: "53 Checkout (P3)",
        description: "Start at 53 and finish on a double; a bust resets the score to 53",
        start_score: 53,
        family: Family::Countdown,
        rules: Rules {
            double_out: true,
            max_darts: Some(3),
            bust_reset: true,
            reset_score: Some(53),
            training_mode: true,
            panels: COUNTDOWN_PANELS,
            ..Rules::NONE
        },
    },
];

/// Result of resolving a mode id, with the fallback made visible.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    pub mode: &'static GameMode,
    /// The requested id was unknown and the default mode was substituted.
    pub fell_back: bool,
}

/// All definitions in declaration order.
pub fn all_modes() -> &'static [GameMode] {
    MODES
}

/// Modes whose rules declare `training_mode`, in declaration order.
pub fn training_modes() -> impl Iterator<Item = &'static GameMode> {
    MODES.iter().filter(|m| m.rules.training_mode)
}

/// Exact lookup.
pub fn find(id: &str) -> Option<&'static GameMode> {
    MODES.iter().find(|m| m.id == id)
}

/// The mode substituted for unknown ids.
pub fn default_mode() -> &'static GameMode {
    &MODES[0]
}

/// Look up a mode, falling back to the default mode for unknown ids.
pub fn get_mode(id: &str) -> &'static GameMode {
    resolve(id).mode
}

/// Like `get_mode()`, but reports whether the fallback was taken.
pub fn resolve(id: &str) -> Resolved {
    match find(id) {
        Some(mode) => Resolved {
            mode,
            fell_back: false,
        },
        None => Resolved {
            mode: default_mode(),
            fell_back: true,
        },
    }
}
