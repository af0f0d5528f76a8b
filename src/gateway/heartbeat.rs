use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::events::GatewayMessage;
use super::session::SessionState;

/// A running heartbeat task. Dropping the handle stops it.
///
/// The task only queues ticks. The receive loop is the sole writer and turns
/// each tick into a frame with [`frame`] at write time, so the sequence it
/// carries is the latest one observed before the write.
#[derive(Debug)]
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawns the heartbeat. The first tick fires one full `interval` after
    /// this call.
    pub fn start(interval: Duration, ticks: mpsc::UnboundedSender<()>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if ticks.send(()).is_err() {
                    tracing::debug!("heartbeat receiver gone, stopping");
                    break;
                }
            }
        });
        Self { handle }
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The heartbeat frame to write right now.
pub fn frame(session: &SessionState) -> GatewayMessage {
    let seq = session.last_sequence();
    tracing::info!("sending heartbeat {seq:?}");
    GatewayMessage::heartbeat(seq)
}
