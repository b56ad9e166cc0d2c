//! Stalled-connection detection.
//!
//! The session driver touches an [`ActivityClock`] on every inbound stanza; the
//! [`LivenessMonitor`] checks it once a minute, probes the server after five
//! quiet minutes and gives up after seven.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{errors::Error, messaging::port::MessagingPort, Result};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub const PROBE_AFTER_MINUTES: u64 = 5;
pub const FATAL_AFTER_MINUTES: u64 = 7;

/// Time of the last inbound activity, shared between the receive path and the
/// monitor.
///
/// Stored as milliseconds since a monotonic origin so it fits in an atomic.
#[derive(Debug)]
pub struct ActivityClock {
    origin: Instant,
    last_ms: AtomicU64,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    /// A clock that counts "now" as the last activity.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    /// Record inbound activity.
    pub fn touch(&self) {
        self.last_ms.store(self.now_ms(), Ordering::Relaxed);
    }

    /// Time since the last recorded activity.
    pub fn idle(&self) -> Duration {
        let last = self.last_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.now_ms().saturating_sub(last))
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Alive,
    Probe,
    Lost,
}

/// Classify an idle period by whole elapsed minutes.
pub fn assess(idle: Duration) -> Verdict {
    let minutes = idle.as_secs() / 60;
    if minutes >= FATAL_AFTER_MINUTES {
        Verdict::Lost
    } else if minutes >= PROBE_AFTER_MINUTES {
        Verdict::Probe
    } else {
        Verdict::Alive
    }
}

pub struct LivenessMonitor {
    clock: Arc<ActivityClock>,
    messenger: Arc<dyn MessagingPort>,
    interval: Duration,
}

impl LivenessMonitor {
    pub fn new(clock: Arc<ActivityClock>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            clock,
            messenger,
            interval: CHECK_INTERVAL,
        }
    }

    /// Run until the connection is declared lost or `cancel` fires.
    ///
    /// Returns `Err(Error::ConnectionLost)` on the fatal path; the caller is
    /// expected to end the process.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let idle = self.clock.idle();
            match assess(idle) {
                Verdict::Alive => {
                    tracing::trace!(idle_secs = idle.as_secs(), "connection alive");
                }
                Verdict::Probe => {
                    tracing::warn!(
                        idle_secs = idle.as_secs(),
                        "no inbound activity, probing server"
                    );
                    if let Err(e) = self.messenger.send_probe().await {
                        tracing::warn!(error = %e, "failed to send liveness probe");
                    }
                }
                Verdict::Lost => {
                    tracing::error!(idle_secs = idle.as_secs(), "Connection lost.");
                    return Err(Error::ConnectionLost);
                }
            }
        }
    }
}
