use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::modes::DEFAULT_MODE_ID;

// ---------------------------------------------------------------------------
// Persisted config types (shared between the CLI and actors)
// ---------------------------------------------------------------------------

/// Top-level persisted config. Kept hand-editable: percentages are 0-100,
/// intervals are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcheConfig {
    #[serde(default)]
    pub player: PlayerSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub statistics: StatisticsSection,
    #[serde(default)]
    pub game: GameSection,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub simulator: HashMap<String, SimulatorSection>,
}

/// The local player recorded in statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSection {
    pub id: String,
    pub name: String,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            id: "player1".into(),
            name: "Player 1".into(),
        }
    }
}

/// Identity of the physical board the session runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSection {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            id: "board".into(),
            name: "Dartboard".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSection {
    /// Snapshot file. None = the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSection {
    pub default_mode: String,
    /// Preselected target for modes that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<u8>,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            default_mode: DEFAULT_MODE_ID.into(),
            default_target: None,
        }
    }
}

/// A simulated board instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorSection {
    #[serde(default)]
    pub name: String,
    /// Pause between darts.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Chance (0-100) that a dart lands where it was aimed.
    #[serde(default = "default_accuracy_pct")]
    pub accuracy_pct: f64,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_accuracy_pct() -> f64 {
    60.0
}

impl Default for OcheConfig {
    /// Known good defaults: one simulated board.
    fn default() -> Self {
        let mut simulator = HashMap::new();
        simulator.insert(
            "0".into(),
            SimulatorSection {
                name: "Simulated Board".into(),
                interval_ms: default_interval_ms(),
                accuracy_pct: default_accuracy_pct(),
                seed: None,
            },
        );
        Self {
            player: PlayerSection::default(),
            board: BoardSection::default(),
            statistics: StatisticsSection::default(),
            game: GameSection::default(),
            simulator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_one_simulator() {
        let config = OcheConfig::default();
        assert_eq!(config.game.default_mode, "501");
        assert_eq!(config.simulator.len(), 1);
        assert_eq!(config.simulator["0"].interval_ms, 1000);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: OcheConfig =
            serde_json::from_str(r#"{"player":{"id":"ann","name":"Ann"}}"#).unwrap();
        assert_eq!(config.player.id, "ann");
        assert_eq!(config.game, GameSection::default());
        assert!(config.simulator.is_empty());
    }

    #[test]
    fn simulator_fields_default_individually() {
        let json = r#"{"simulator":{"1":{"name":"Fast","interval_ms":50}}}"#;
        let config: OcheConfig = serde_json::from_str(json).unwrap();
        let sim = &config.simulator["1"];
        assert_eq!(sim.interval_ms, 50);
        assert!((sim.accuracy_pct - 60.0).abs() < f64::EPSILON);
        assert_eq!(sim.seed, None);
    }
}
