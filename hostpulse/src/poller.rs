//! Background fetchers: the one-shot static loader and the periodic snapshot
//! pollers. Each owns the sender half of exactly one watch cell.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Produces one fetch per call. Each returned future owns what it needs so it
/// can run on its own task and overlap with later fetches.
pub trait Fetch<T>: Send + Sync + 'static {
    fn fetch(&self) -> BoxFuture<'static, Result<T>>;
}

impl<T, F> Fetch<T> for F
where
    F: Fn() -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
{
    fn fetch(&self) -> BoxFuture<'static, Result<T>> {
        (self)()
    }
}

/// What to do with a response that completes after a newer one was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Whatever completes last is shown, even if it was issued earlier.
    LastCompleted,
    /// Responses older than the newest applied one are dropped.
    #[default]
    DiscardStale,
}

impl ResponseOrdering {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "last-completed" => Some(Self::LastCompleted),
            "discard-stale" => Some(Self::DiscardStale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastCompleted => "last-completed",
            Self::DiscardStale => "discard-stale",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub ordering: ResponseOrdering,
}

/// Tracks the newest applied request so stale completions can be recognised.
#[derive(Debug, Default)]
pub struct SequenceGate {
    issued: u64,
    applied: Option<u64>,
}

impl SequenceGate {
    pub fn issue(&mut self) -> u64 {
        let seq = self.issued;
        self.issued += 1;
        seq
    }

    /// True if a completion for `seq` should replace the current value.
    pub fn admit(&mut self, seq: u64, ordering: ResponseOrdering) -> bool {
        let stale = self.applied.is_some_and(|a| seq < a);
        if stale && ordering == ResponseOrdering::DiscardStale {
            return false;
        }
        self.applied = Some(self.applied.map_or(seq, |a| a.max(seq)));
        true
    }
}

/// Resolves once shutdown is signalled or the session handle is gone. Yields
/// nothing, so a `select!` branch on it holds no borrow of the receiver.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Fetches once at startup. On failure the cell stays `None` for the whole
/// session; there is no retry.
pub fn spawn_static_loader<T, F>(
    name: &'static str,
    source: F,
    tx: watch::Sender<Option<Arc<T>>>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fetch<T>,
{
    tokio::spawn(async move {
        let res = tokio::select! {
            res = source.fetch() => res,
            _ = stopped(&mut shutdown) => return,
        };
        if *shutdown.borrow() {
            return;
        }
        match res {
            Ok(v) => {
                info!(feed = name, "loaded");
                tx.send_replace(Some(Arc::new(v)));
            }
            Err(e) => warn!(feed = name, error = %e, "initial fetch failed; continuing without it"),
        }
    })
}

/// Issues a fetch every `settings.interval` (first one immediately). Fetches
/// run on their own tasks and may overlap; completions funnel back here so
/// this task stays the only writer of `tx`.
///
/// A failed fetch is logged and the cell keeps its last value; the next tick
/// proceeds as scheduled.
pub fn spawn_poller<T, F>(
    name: &'static str,
    source: F,
    settings: PollSettings,
    tx: watch::Sender<Option<Arc<T>>>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fetch<T>,
{
    tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u64, Result<T>)>();
        let mut gate = SequenceGate::default();
        let mut ticker = interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    let seq = gate.issue();
                    let fut = source.fetch();
                    let done_tx = done_tx.clone();
                    tokio::spawn(async move {
                        let res = fut.await;
                        // receiver is gone after teardown; dropping the result is the point
                        let _ = done_tx.send((seq, res));
                    });
                }
                Some((seq, res)) = done_rx.recv() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    match res {
                        Ok(v) => {
                            if gate.admit(seq, settings.ordering) {
                                tx.send_replace(Some(Arc::new(v)));
                            } else {
                                debug!(feed = name, seq, "dropping stale response");
                            }
                        }
                        Err(e) if e.is_protocol() => {
                            warn!(feed = name, seq, error = %e, "bad payload; keeping last snapshot")
                        }
                        Err(e) => warn!(feed = name, seq, error = %e, "fetch failed; keeping last snapshot"),
                    }
                }
                _ = stopped(&mut shutdown) => break,
            }
        }
        debug!(feed = name, "poller stopped");
    })
}
