//! Bus wrappers over `tokio::sync::broadcast`. Actors only ever see
//! `BusSender` and `BusReceiver`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

use oche::DartMessage;

/// Returned by `BusReceiver` once the bus is closed or the owning actor was
/// asked to stop.
#[derive(Debug)]
pub enum PollError {
    Shutdown,
}

/// Sender bound to one actor. Every outbound message is stamped with the
/// actor's global id.
#[derive(Clone)]
pub struct BusSender {
    actor_id: String,
    inner: broadcast::Sender<DartMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusSender {
    pub fn new(
        actor_id: String,
        inner: broadcast::Sender<DartMessage>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actor_id,
            inner,
            shutdown,
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Stamp `source` and broadcast. A bus with no subscribers drops the
    /// message silently.
    pub fn send(&self, mut msg: DartMessage) {
        msg.source.clone_from(&self.actor_id);
        let _ = self.inner.send(msg);
    }

    /// New receiver sharing this sender's shutdown flag.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            inner: self.inner.subscribe(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

pub struct BusReceiver {
    inner: broadcast::Receiver<DartMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusReceiver {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Non-blocking: next message, `Ok(None)` when drained.
    pub fn poll(&mut self) -> Result<Option<DartMessage>, PollError> {
        if self.is_shutdown() {
            return Err(PollError::Shutdown);
        }
        loop {
            match self.inner.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(PollError::Shutdown),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("bus: lagged, dropped {n} events");
                }
            }
        }
    }

    /// Like `poll()`, but sleeps for `idle` first when nothing is queued.
    /// Thread actors call this at the top of their loop.
    pub fn next(&mut self, idle: Duration) -> Result<Option<DartMessage>, PollError> {
        match self.poll()? {
            Some(msg) => Ok(Some(msg)),
            None => {
                std::thread::sleep(idle);
                self.poll()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oche::{DartEvent, GameCommand};

    fn bus() -> (BusSender, Arc<AtomicBool>) {
        let (tx, _) = broadcast::channel(16);
        let shutdown = Arc::new(AtomicBool::new(false));
        (BusSender::new("cli".into(), tx, Arc::clone(&shutdown)), shutdown)
    }

    #[test]
    fn send_stamps_source() {
        let (sender, _) = bus();
        let mut receiver = sender.subscribe();
        sender.send(DartMessage::new(GameCommand::Stop).source("spoofed"));
        let msg = receiver.poll().unwrap().unwrap();
        assert_eq!(msg.source, "cli");
        assert!(matches!(msg.event, DartEvent::GameCommand(GameCommand::Stop)));
        assert!(receiver.poll().unwrap().is_none());
    }

    #[test]
    fn next_waits_then_returns_none() {
        let (sender, _) = bus();
        let mut receiver = sender.subscribe();
        assert!(receiver.next(Duration::from_millis(1)).unwrap().is_none());
    }

    #[test]
    fn shutdown_flag_stops_polling() {
        let (sender, shutdown) = bus();
        let mut receiver = sender.subscribe();
        shutdown.store(true, Ordering::Relaxed);
        assert!(matches!(receiver.poll(), Err(PollError::Shutdown)));
    }
}
