//! Simulated dartboard. Throws at whatever the running game asks for.
//!
//! Reads the live game, picks a sensible aim point, and lands the dart there
//! with probability `accuracy_pct`. Misses scatter to a miss, the single ring
//! of the aimed segment, or a neighbouring segment. Emits `ThrowDetected`
//! with `simulated: true`, only while a game is running.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use oche::checkout;
use oche::modes::Family;
use oche::{
    ActorState, ActorStatus, BULL, DartMessage, GameState, Multiplier, Throw, ThrowDetected,
};

const TICK: Duration = Duration::from_millis(10);

/// Clockwise segment order starting at the top.
const BOARD_ORDER: [u8; 20] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

pub struct SimulatorActor {
    pub interval: Duration,
    pub accuracy_pct: f64,
    /// Fixed seed, `None` = seeded from the clock.
    pub seed: Option<u64>,
}

impl Actor for SimulatorActor {
    fn start(
        &self,
        state: Arc<SystemState>,
        sender: BusSender,
        receiver: BusReceiver,
    ) -> anyhow::Result<()> {
        let thread_name = format!("sim:{}", sender.actor_id());
        let interval = self.interval;
        let accuracy = self.accuracy_pct;
        let seed = self.seed.unwrap_or_else(now_ms);

        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(interval, accuracy, seed, state, sender, receiver))
            .context("failed to spawn simulator thread")?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn next_rand(seed: &mut u64) -> usize {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 33) as usize
}

fn emit_status(sender: &BusSender, status: ActorStatus, accuracy: f64, thrown: u32) {
    let mut telemetry = HashMap::new();
    telemetry.insert("accuracy_pct".into(), format!("{accuracy:.0}"));
    telemetry.insert("darts".into(), thrown.to_string());
    sender.send(DartMessage::new(ActorState::new(status, telemetry)));
}

fn run(
    interval: Duration,
    accuracy: f64,
    mut seed: u64,
    state: Arc<SystemState>,
    sender: BusSender,
    mut receiver: BusReceiver,
) {
    let name = sender.actor_id().to_string();
    tracing::info!("simulator '{name}': started (accuracy {accuracy:.0}%)");
    emit_status(&sender, ActorStatus::Running, accuracy, 0);

    let mut thrown = 0u32;
    let mut last = Instant::now();
    loop {
        // Bus traffic is irrelevant here; keep the receiver drained.
        match receiver.next(TICK) {
            Err(PollError::Shutdown) => break,
            Ok(Some(_)) => continue,
            Ok(None) => {}
        }
        if last.elapsed() < interval {
            continue;
        }
        last = Instant::now();

        let game = state.game.snapshot();
        let Some(aim) = aim_for(&game) else {
            continue;
        };
        let throw = scatter(aim, accuracy, &mut seed);
        thrown += 1;
        tracing::debug!("simulator '{name}': aimed {aim}, hit {throw}");
        sender.send(DartMessage::new(ThrowDetected {
            throw,
            simulated: true,
        }));
    }

    emit_status(&sender, ActorStatus::Stopped, accuracy, thrown);
    tracing::info!("simulator '{name}': stopped after {thrown} darts");
}

/// Where a competent player would aim next. `None` while there is nothing
/// to throw at (idle, or waiting for a target selection).
pub fn aim_for(game: &GameState) -> Option<Throw> {
    if !game.is_playing {
        return None;
    }
    let mode = game.mode()?;
    let progress = &game.progress;
    if mode.needs_selection() && progress.selected_target.is_none() {
        return None;
    }

    let aim = match mode.family {
        Family::Countdown | Family::CountdownLadder => {
            countdown_aim(game.current_score, mode.rules.double_out)
        }
        Family::Ladder => {
            let segment = *mode.rules.sequence.get(progress.current_step)?;
            Throw::single(segment)
        }
        Family::TargetFocus => Throw::single(progress.selected_target?),
        Family::DoubleFinish => Throw::double(progress.selected_target?),
        Family::Restricted => {
            let targets = mode.rules.targets;
            if targets.is_empty() {
                return None;
            }
            let segment = targets[progress.hits as usize % targets.len()];
            let multiplier = mode.rules.required_multiplier.unwrap_or(Multiplier::Single);
            Throw::new(segment, multiplier)
        }
        Family::Free => Throw::triple(20),
    };
    Some(aim)
}

fn countdown_aim(remaining: u32, double_out: bool) -> Throw {
    if let Some(first) = checkout::lookup(remaining).and_then(|f| f[0].parse().ok()) {
        return first;
    }
    match remaining {
        0 => Throw::miss(),
        n @ 1..=20 if !double_out => Throw::single(n as u8),
        n @ 2..=40 if n % 2 == 0 => Throw::double((n / 2) as u8),
        1..=40 => Throw::single(1),
        n @ 41..=60 => Throw::single((n - 40) as u8),
        61 => Throw::triple(19),
        _ => Throw::triple(20),
    }
}

/// Land a dart aimed at `aim`. Always returns a dart that exists on the board.
pub fn scatter(aim: Throw, accuracy_pct: f64, seed: &mut u64) -> Throw {
    let roll = (next_rand(seed) % 10_000) as f64 / 100.0;
    if roll < accuracy_pct {
        return aim;
    }
    match next_rand(seed) % 3 {
        0 => Throw::miss(),
        1 if aim.segment == BULL => Throw::outer_bull(),
        1 => Throw::single(aim.segment.max(1)),
        _ => {
            let Some(pos) = BOARD_ORDER.iter().position(|&s| s == aim.segment) else {
                return Throw::miss();
            };
            let offset = if next_rand(seed) % 2 == 0 {
                1
            } else {
                BOARD_ORDER.len() - 1
            };
            let neighbour = BOARD_ORDER[(pos + offset) % BOARD_ORDER.len()];
            Throw::new(neighbour, aim.multiplier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_aims_along_known_finishes() {
        let mut game = GameState::new_game("501-double-out");
        assert_eq!(aim_for(&game), Some(Throw::triple(20)));
        game.current_score = 170;
        assert_eq!(aim_for(&game), Some(Throw::triple(20)));
        game.current_score = 32;
        assert_eq!(aim_for(&game), Some(Throw::double(16)));
        game.current_score = 33;
        assert_eq!(aim_for(&game), Some(Throw::single(1)));
        game.current_score = 57;
        assert_eq!(aim_for(&game), Some(Throw::single(17)));
        game.current_score = 61;
        assert_eq!(aim_for(&game), Some(Throw::triple(19)));
    }

    #[test]
    fn ladder_aims_at_current_step() {
        let mut game = GameState::new_game("around-the-clock");
        assert_eq!(aim_for(&game), Some(Throw::single(1)));
        game.throw_dart(Throw::single(1));
        assert_eq!(aim_for(&game), Some(Throw::single(2)));
    }

    #[test]
    fn waits_for_a_selection() {
        let mut game = GameState::new_game("double-finish-programm2");
        assert_eq!(aim_for(&game), None);
        game.select_target(16).unwrap();
        assert_eq!(aim_for(&game), Some(Throw::double(16)));
    }

    #[test]
    fn idle_game_has_no_aim() {
        assert_eq!(aim_for(&GameState::default()), None);
    }

    #[test]
    fn perfect_accuracy_always_hits() {
        let mut seed = 42;
        for _ in 0..200 {
            assert_eq!(scatter(Throw::triple(20), 100.0, &mut seed), Throw::triple(20));
        }
    }

    #[test]
    fn misses_land_on_the_board() {
        let mut seed = 7;
        for aim in [Throw::triple(20), Throw::double(5), Throw::bullseye(), Throw::single(11)] {
            for _ in 0..200 {
                let hit = scatter(aim, 0.0, &mut seed);
                assert!(hit.is_consistent(), "{hit:?} from {aim}");
                if aim.multiplier != Multiplier::Single {
                    assert_ne!(hit, aim);
                }
            }
        }
    }

    #[test]
    fn simulated_darts_finish_a_game() {
        let mut seed = 1;
        let mut game = GameState::new_game("301");
        for _ in 0..500 {
            let Some(aim) = aim_for(&game) else { break };
            game.throw_dart(scatter(aim, 80.0, &mut seed));
        }
        assert_eq!(game.progress.checkouts, 1);
        assert!(!game.is_playing);
    }
}
