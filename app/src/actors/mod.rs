//! Actor infrastructure: shared trait and actor resolution.

pub mod recorder;
pub mod session;
pub mod simulator;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use crate::state::config::{OcheConfig, global_id};
use oche::DartMessage;

// ---------------------------------------------------------------------------
// Actor trait
// ---------------------------------------------------------------------------

/// Common trait for self-managed actors. Each actor struct holds its own config;
/// `start()` clones what it needs and spawns a thread.
pub trait Actor: Send + Sync {
    /// Spawn the actor's run loop.
    fn start(
        &self,
        state: Arc<SystemState>,
        sender: BusSender,
        receiver: BusReceiver,
    ) -> anyhow::Result<()>;

    /// Request the actor to stop. Default: no-op (actors check the shutdown
    /// flag via `BusReceiver::is_shutdown()`).
    fn stop(&self) {}
}

// ---------------------------------------------------------------------------
// Actor resolution
// ---------------------------------------------------------------------------

/// A concrete actor ready to be started, resolved from config.
pub struct ResolvedActor {
    pub id: String,
    pub name: String,
    pub actor: Box<dyn Actor>,
}

/// Build the list of simulated boards from the persisted config, sorted by id.
///
/// Out-of-range accuracies are clamped to 0-100.
pub fn resolve_actors(config: &OcheConfig) -> Vec<ResolvedActor> {
    let mut actors: Vec<ResolvedActor> = config
        .simulator
        .iter()
        .map(|(index, section)| {
            let id = global_id("simulator", index);
            if !(0.0..=100.0).contains(&section.accuracy_pct) {
                tracing::warn!(
                    "simulator '{id}': accuracy {} outside 0-100, clamping",
                    section.accuracy_pct
                );
            }
            ResolvedActor {
                id,
                name: section.name.clone(),
                actor: Box::new(simulator::SimulatorActor {
                    interval: Duration::from_millis(section.interval_ms),
                    accuracy_pct: section.accuracy_pct.clamp(0.0, 100.0),
                    seed: section.seed,
                }),
            }
        })
        .collect();
    actors.sort_by(|a, b| a.id.cmp(&b.id));
    actors
}

/// Start a resolved actor: create bus wrappers, call start(), register in state.
pub fn start_actor(
    id: String,
    actor: Box<dyn Actor>,
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<DartMessage>,
) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let sender = BusSender::new(id.clone(), bus_tx.clone(), Arc::clone(&shutdown));
    let receiver = sender.subscribe();
    actor.start(Arc::clone(state), sender, receiver)?;
    state.register_actor(id, actor, shutdown);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oche::SimulatorSection;

    #[test]
    fn one_actor_per_simulator_section() {
        let mut config = OcheConfig::default();
        config.simulator.insert(
            "1".into(),
            SimulatorSection {
                name: "Wild".into(),
                interval_ms: 10,
                accuracy_pct: 250.0,
                seed: Some(7),
            },
        );
        let resolved = resolve_actors(&config);
        let ids: Vec<&str> = resolved.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["simulator.0", "simulator.1"]);
        assert_eq!(resolved[1].name, "Wild");
    }

    #[test]
    fn no_sections_no_actors() {
        let mut config = OcheConfig::default();
        config.simulator.clear();
        assert!(resolve_actors(&config).is_empty());
    }
}
