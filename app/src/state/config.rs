//! Configuration loading, resolution, and persistence.
//!
//! Handles the TOML config file (~/.config/oche/config.toml) with fixed
//! sections (`[player]`, `[board]`, `[statistics]`, `[game]`) and indexed
//! `[simulator.<id>]` sections.

use std::path::{Path, PathBuf};

pub use oche::OcheConfig;

/// Build a global ID from a type prefix and index: `"simulator.0"`.
pub fn global_id(prefix: &str, index: &str) -> String {
    format!("{prefix}.{index}")
}

// ---------------------------------------------------------------------------
// Persistence I/O
// ---------------------------------------------------------------------------

/// Returns `~/.config/oche/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oche")
        .join("config.toml")
}

/// Returns `<data dir>/oche/statistics.json`.
pub fn default_statistics_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oche")
        .join("statistics.json")
}

/// Statistics file for a config: the configured path or the default.
pub fn statistics_path(config: &OcheConfig) -> PathBuf {
    config
        .statistics
        .path
        .clone()
        .unwrap_or_else(default_statistics_path)
}

/// Load persisted config from disk. If the file does not exist, creates it
/// with all-defaults and returns that. Unreadable or unparsable files fall
/// back to defaults without being overwritten.
pub fn load(path: &Path) -> OcheConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<OcheConfig>(&contents) {
            Ok(config) => {
                tracing::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                OcheConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = OcheConfig::default();
            tracing::info!("no config file found, creating {}", path.display());
            save_to(path, &defaults);
            defaults
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            OcheConfig::default()
        }
    }
}

/// Write config to a specific path. Creates parent dirs if needed. Never panics.
pub fn save_to(path: &Path, config: &OcheConfig) {
    if let Some(dir) = path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        tracing::warn!("failed to create config dir {}: {e}", dir.display());
        return;
    }
    match toml::to_string_pretty(config) {
        Ok(contents) => {
            if let Err(e) = std::fs::write(path, contents) {
                tracing::warn!("failed to write {}: {e}", path.display());
            }
        }
        Err(e) => {
            tracing::warn!("failed to serialize config: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Cached config
// ---------------------------------------------------------------------------

/// Configuration loaded once at startup and shared read-only by actors.
pub struct SystemConfig {
    path: PathBuf,
    config: OcheConfig,
}

impl SystemConfig {
    pub fn new(path: PathBuf, config: OcheConfig) -> Self {
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &OcheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("oche-config-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);
        let config = load(&path);
        assert_eq!(config, OcheConfig::default());
        assert!(path.exists());
        assert_eq!(load(&path), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn toml_round_trip_keeps_sections() {
        let path = temp_path("roundtrip");
        let mut config = OcheConfig::default();
        config.player.name = "Ann".into();
        config.game.default_mode = "leiter-123".into();
        config.statistics.path = Some(PathBuf::from("/tmp/stats.json"));
        save_to(&path, &config);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[simulator.0]"));
        assert_eq!(load(&path), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn garbage_falls_back_to_defaults_and_is_kept() {
        let path = temp_path("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "player = 3").unwrap();
        assert_eq!(load(&path), OcheConfig::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "player = 3");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn statistics_path_prefers_config() {
        let mut config = OcheConfig::default();
        assert_eq!(statistics_path(&config), default_statistics_path());
        config.statistics.path = Some(PathBuf::from("stats.json"));
        assert_eq!(statistics_path(&config), PathBuf::from("stats.json"));
    }

    #[test]
    fn system_config_hands_out_the_loaded_config() {
        let mut config = OcheConfig::default();
        config.board.name = "Garage".into();
        let system = SystemConfig::new(PathBuf::from("oche.toml"), config.clone());
        assert_eq!(system.config(), &config);
        assert_eq!(system.path(), Path::new("oche.toml"));
    }
}
