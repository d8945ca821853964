//! Turns consecutive cumulative counter readings into download/upload rates.

use crate::types::{CounterReading, Rate};

/// Holds the previous reading only; everything older is gone.
#[derive(Debug, Default, Clone)]
pub struct ThroughputEstimator {
    prev: Option<CounterReading>,
}

impl ThroughputEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next reading. Returns a rate only when a usable previous reading
    /// exists and time moved forward between the two.
    ///
    /// A counter that went down (interface restart) reports 0 for that interval.
    pub fn observe(&mut self, next: CounterReading) -> Option<Rate> {
        let prev = self.prev.replace(next)?;
        rate_between(&prev, &next)
    }

    /// Forget the previous reading, e.g. after a reconnect, so the next pair
    /// is not computed across the gap.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn previous(&self) -> Option<&CounterReading> {
        self.prev.as_ref()
    }
}

pub fn rate_between(prev: &CounterReading, next: &CounterReading) -> Option<Rate> {
    let dt = (next.timestamp_ms - prev.timestamp_ms) as f64 / 1000.0;
    if dt <= 0.0 {
        return None;
    }
    let down = next.bytes_received.saturating_sub(prev.bytes_received) as f64 / dt;
    let up = next.bytes_sent.saturating_sub(prev.bytes_sent) as f64 / dt;
    Some(Rate::clamped(down, up))
}
