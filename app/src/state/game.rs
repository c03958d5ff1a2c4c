//! The running `GameState`, shared read-only.
//!
//! The engine types come from the `oche` lib. This module only adds the
//! reader/writer split: every actor can take snapshots, only the session
//! actor can change the game.

use std::sync::{Arc, RwLock};

use oche::GameState;

/// Read-only view of the running game. Lives on `SystemState.game`.
pub struct LiveGame {
    inner: Arc<RwLock<GameState>>,
}

/// Write handle for the running game. Only the `SessionActor` holds this.
pub struct LiveGameWriter {
    inner: Arc<RwLock<GameState>>,
}

impl LiveGame {
    /// Create an idle game and its companion writer.
    pub fn new() -> (Self, LiveGameWriter) {
        let inner = Arc::new(RwLock::new(GameState::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            LiveGameWriter { inner },
        )
    }

    pub fn snapshot(&self) -> GameState {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LiveGameWriter {
    /// Mutate the game under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn snapshot(&self) -> GameState {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
