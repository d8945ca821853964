//! Uptime derived from the host boot time and the local wall clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::poller::stopped;
use crate::types::StaticInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uptime {
    pub seconds: u64,
    pub formatted: String,
}

impl Uptime {
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds,
            formatted: format_uptime(seconds),
        }
    }
}

/// Whole seconds between boot and `now`; zero if the boot time is in the future.
pub fn elapsed_secs(boot: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = now.timestamp_millis() - boot.timestamp_millis();
    if ms <= 0 {
        0
    } else {
        (ms / 1000) as u64
    }
}

/// `{d}d {h}h {m}m`; a unit appears once it or any larger unit is non-zero.
/// Seconds are dropped, so anything under a minute is an empty string.
pub fn format_uptime(total_secs: u64) -> String {
    let d = total_secs / 86_400;
    let h = (total_secs % 86_400) / 3_600;
    let m = (total_secs % 3_600) / 60;

    let mut parts: Vec<String> = Vec::with_capacity(3);
    if d > 0 {
        parts.push(format!("{d}d"));
    }
    if d > 0 || h > 0 {
        parts.push(format!("{h}h"));
    }
    if d > 0 || h > 0 || m > 0 {
        parts.push(format!("{m}m"));
    }
    parts.join(" ")
}

/// Waits for static info, then publishes uptime once per `tick`. Each tick
/// re-reads the system clock, so timer jitter never accumulates.
pub fn spawn_uptime_clock(
    mut static_rx: watch::Receiver<Option<Arc<StaticInfo>>>,
    tx: watch::Sender<Option<Uptime>>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (boot, seeded) = tokio::select! {
            res = static_rx.wait_for(|s| s.is_some()) => match res {
                Ok(info) => match info.as_ref() {
                    Some(info) => {
                        let seed = info.uptime_seconds.filter(|s| *s >= 0.0);
                        if let Some(secs) = seed {
                            tx.send_replace(Some(Uptime::from_seconds(secs as u64)));
                        }
                        (info.boot_time, seed.is_some())
                    }
                    None => return,
                },
                // loader gone without ever publishing
                Err(_) => return,
            },
            _ = stopped(&mut shutdown) => return,
        };
        debug!(%boot, "uptime clock started");

        // a seeded value stands until the first full tick
        let start = if seeded {
            Instant::now() + tick
        } else {
            Instant::now()
        };
        let mut ticker = interval_at(start, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    let secs = elapsed_secs(boot, Utc::now());
                    tx.send_replace(Some(Uptime::from_seconds(secs)));
                }
                _ = stopped(&mut shutdown) => break,
            }
        }
        debug!("uptime clock stopped");
    })
}
