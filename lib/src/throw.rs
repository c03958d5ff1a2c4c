//! Dart throw model — segment, multiplier and score.
//!
//! A `Throw` is the single input the engine understands. Camera detection,
//! the simulated board and scripted CLI input all produce the same type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Segment number of the bull (single bull 25, double bull 50).
pub const BULL: u8 = 25;

/// Segment number used for a dart that missed the scoring area.
pub const MISS: u8 = 0;

/// Highest score a single dart can make (treble 20).
pub const MAX_DART_SCORE: i32 = 60;

/// Ring hit by a dart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Multiplier {
    Single,
    Double,
    Triple,
}

impl Multiplier {
    pub fn factor(self) -> i32 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }

    /// Label prefix: `S`, `D`, `T`.
    pub fn prefix(self) -> char {
        match self {
            Self::Single => 'S',
            Self::Double => 'D',
            Self::Triple => 'T',
        }
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Double => write!(f, "double"),
            Self::Triple => write!(f, "triple"),
        }
    }
}

/// A single dart.
///
/// `score` is carried separately from `segment`/`multiplier` because throws
/// arrive from untrusted sources (detector output, JSON). Validation checks
/// that the three agree; the constructors always produce consistent throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throw {
    pub score: i32,
    pub segment: u8,
    pub multiplier: Multiplier,
}

impl Throw {
    /// Build a throw from segment and multiplier, deriving the score.
    pub fn new(segment: u8, multiplier: Multiplier) -> Self {
        Self {
            score: i32::from(segment) * multiplier.factor(),
            segment,
            multiplier,
        }
    }

    pub fn single(segment: u8) -> Self {
        Self::new(segment, Multiplier::Single)
    }

    pub fn double(segment: u8) -> Self {
        Self::new(segment, Multiplier::Double)
    }

    pub fn triple(segment: u8) -> Self {
        Self::new(segment, Multiplier::Triple)
    }

    /// Single bull (25).
    pub fn outer_bull() -> Self {
        Self::single(BULL)
    }

    /// Double bull (50).
    pub fn bullseye() -> Self {
        Self::double(BULL)
    }

    pub fn miss() -> Self {
        Self::single(MISS)
    }

    pub fn is_miss(&self) -> bool {
        self.segment == MISS
    }

    pub fn is_bull(&self) -> bool {
        self.segment == BULL
    }

    /// Score lies in `0..=60`.
    pub fn score_in_range(&self) -> bool {
        (0..=MAX_DART_SCORE).contains(&self.score)
    }

    /// Segment exists on the board, the ring exists for that segment, and
    /// `score == face value × multiplier`.
    pub fn is_consistent(&self) -> bool {
        let segment_ok = match self.segment {
            MISS => self.multiplier == Multiplier::Single,
            1..=20 => true,
            BULL => self.multiplier != Multiplier::Triple,
            _ => false,
        };
        segment_ok && self.score == i32::from(self.segment) * self.multiplier.factor()
    }

    /// Double-out finishing test on the score alone: even and at most 40.
    ///
    /// Detector input does not always carry a trustworthy ring, so the
    /// finishing rule looks at the score the same way for every source.
    pub fn counts_as_double_finish(&self) -> bool {
        self.score % 2 == 0 && self.score <= 40
    }

    /// Board label: `T20`, `D16`, `S5`, `25`, `Bull`, `Miss`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Throw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.segment, self.multiplier) {
            (MISS, _) => write!(f, "Miss"),
            (BULL, Multiplier::Double) => write!(f, "Bull"),
            (BULL, _) => write!(f, "25"),
            (n, m) => write!(f, "{}{n}", m.prefix()),
        }
    }
}

impl std::str::FromStr for Throw {
    type Err = String;

    /// Parse a board label case-insensitively.
    ///
    /// Accepts `T20`, `D16`, `S5`, a bare number (`20` = single 20, `25` =
    /// single bull), `SB`/`S25` (single bull), `Bull`/`DB`/`D25` (double
    /// bull) and `Miss`/`M`/`0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_uppercase();
        match label.as_str() {
            "MISS" | "M" | "0" => return Ok(Self::miss()),
            "BULL" | "DB" | "BULLSEYE" => return Ok(Self::bullseye()),
            "SB" | "OUTER" => return Ok(Self::outer_bull()),
            _ => {}
        }

        let (multiplier, digits) = match label.chars().next() {
            Some('S') => (Multiplier::Single, &label[1..]),
            Some('D') => (Multiplier::Double, &label[1..]),
            Some('T') => (Multiplier::Triple, &label[1..]),
            Some(c) if c.is_ascii_digit() => (Multiplier::Single, label.as_str()),
            _ => return Err(format!("invalid dart label {s:?}")),
        };
        let segment: u8 = digits
            .parse()
            .map_err(|_| format!("invalid segment in dart label {s:?}"))?;
        let throw = Self::new(segment, multiplier);
        if !throw.is_consistent() {
            return Err(format!("no such dart on the board: {s:?}"));
        }
        Ok(throw)
    }
}
