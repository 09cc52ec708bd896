//! Round-trip latency probe
//!
//! Fire and forget: a probe that never gets an answer is simply replaced by
//! the next one.

use std::time::{Duration, Instant};

/// How often the client sends a probe
pub const PROBE_INTERVAL: Duration = Duration::from_millis(1500);

#[derive(Debug, Default)]
pub struct LatencyProbe {
    sent_at: Option<Instant>,
    last: Option<Duration>,
}

impl LatencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a probe went out, superseding any unanswered one
    pub fn start(&mut self, now: Instant) {
        self.sent_at = Some(now);
    }

    /// Match a reply against the outstanding probe
    pub fn on_pong(&mut self, now: Instant) -> Option<Duration> {
        let sent_at = self.sent_at.take()?;
        let rtt = now.saturating_duration_since(sent_at);
        self.last = Some(rtt);
        Some(rtt)
    }

    /// Most recent measurement
    pub fn last(&self) -> Option<Duration> {
        self.last
    }

    pub fn is_pending(&self) -> bool {
        self.sent_at.is_some()
    }
}
