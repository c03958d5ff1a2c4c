pub mod config;
mod game;

pub use game::{LiveGame, LiveGameWriter};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::actors::Actor;
use config::{OcheConfig, SystemConfig};

/// Root entry point for all managed application state.
///
/// Passed as `Arc<SystemState>` to all actors.
pub struct SystemState {
    pub system: SystemConfig,
    pub game: LiveGame,
    actors: RwLock<HashMap<String, (Box<dyn Actor>, Arc<AtomicBool>)>>,
}

impl SystemState {
    pub fn new(config_path: PathBuf, config: OcheConfig) -> (Self, LiveGameWriter) {
        let (game, writer) = LiveGame::new();
        (
            Self {
                system: SystemConfig::new(config_path, config),
                game,
                actors: RwLock::new(HashMap::new()),
            },
            writer,
        )
    }

    // ----- Actor registry -----

    /// Register an actor in the registry with its shutdown flag.
    pub fn register_actor(&self, id: String, actor: Box<dyn Actor>, shutdown: Arc<AtomicBool>) {
        self.actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (actor, shutdown));
    }

    /// Registered actor IDs, sorted.
    pub fn actor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .actors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Stop an actor by setting its shutdown flag and calling `stop()`.
    pub fn stop_actor(&self, id: &str) {
        let guard = self.actors.read().unwrap_or_else(|e| e.into_inner());
        if let Some((actor, shutdown)) = guard.get(id) {
            shutdown.store(true, Ordering::Relaxed);
            actor.stop();
        }
    }
}
