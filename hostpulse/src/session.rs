//! Session wiring: spawns every producer, hands out read-only views, and tears
//! everything down together.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::history::RollingWindow;
use crate::http::ApiClient;
use crate::poller::{spawn_poller, spawn_static_loader, PollSettings};
use crate::profiles::Settings;
use crate::ranker::{rank_processes, RankedProcess};
use crate::types::{DailyReport, DynamicSnapshot, HourlyReport, StaticInfo};
use crate::uptime::{spawn_uptime_clock, Uptime};
use crate::ws::{spawn_network_stream, tls_config, StreamSettings, StreamStatus};

/// Receivers for every state cell. Clones are cheap; none of them can write.
#[derive(Clone)]
pub struct Views {
    pub static_info: watch::Receiver<Option<Arc<StaticInfo>>>,
    pub dynamic: watch::Receiver<Option<Arc<DynamicSnapshot>>>,
    pub uptime: watch::Receiver<Option<Uptime>>,
    pub throughput: watch::Receiver<RollingWindow>,
    pub stream_status: watch::Receiver<StreamStatus>,
    pub daily: watch::Receiver<Option<Arc<DailyReport>>>,
    pub hourly: watch::Receiver<Option<Arc<HourlyReport>>>,
    top_limit: usize,
}

impl Views {
    pub fn static_info(&self) -> Option<Arc<StaticInfo>> {
        self.static_info.borrow().clone()
    }

    pub fn dynamic(&self) -> Option<Arc<DynamicSnapshot>> {
        self.dynamic.borrow().clone()
    }

    pub fn uptime(&self) -> Option<Uptime> {
        self.uptime.borrow().clone()
    }

    pub fn throughput(&self) -> RollingWindow {
        self.throughput.borrow().clone()
    }

    pub fn stream_status(&self) -> StreamStatus {
        *self.stream_status.borrow()
    }

    pub fn daily(&self) -> Option<Arc<DailyReport>> {
        self.daily.borrow().clone()
    }

    pub fn hourly(&self) -> Option<Arc<HourlyReport>> {
        self.hourly.borrow().clone()
    }

    /// Top processes of the current snapshot; memory share is 0 until static
    /// info has loaded.
    pub fn top_processes(&self) -> Vec<RankedProcess> {
        let total = self.static_info().map(|s| s.total_memory_bytes);
        match self.dynamic() {
            Some(d) => rank_processes(&d.processes, total, self.top_limit),
            None => Vec::new(),
        }
    }
}

/// Writers for every cell, handed to the producer tasks. Split out so tests
/// can drive producers individually.
pub struct Cells {
    pub static_info: watch::Sender<Option<Arc<StaticInfo>>>,
    pub dynamic: watch::Sender<Option<Arc<DynamicSnapshot>>>,
    pub uptime: watch::Sender<Option<Uptime>>,
    pub throughput: watch::Sender<RollingWindow>,
    pub stream_status: watch::Sender<StreamStatus>,
    pub daily: watch::Sender<Option<Arc<DailyReport>>>,
    pub hourly: watch::Sender<Option<Arc<HourlyReport>>>,
}

pub fn cells(window_capacity: usize, top_limit: usize) -> (Cells, Views) {
    let (static_tx, static_rx) = watch::channel(None);
    let (dynamic_tx, dynamic_rx) = watch::channel(None);
    let (uptime_tx, uptime_rx) = watch::channel(None);
    let (window_tx, window_rx) = watch::channel(RollingWindow::new(window_capacity));
    let (status_tx, status_rx) = watch::channel(StreamStatus::default());
    let (daily_tx, daily_rx) = watch::channel(None);
    let (hourly_tx, hourly_rx) = watch::channel(None);
    (
        Cells {
            static_info: static_tx,
            dynamic: dynamic_tx,
            uptime: uptime_tx,
            throughput: window_tx,
            stream_status: status_tx,
            daily: daily_tx,
            hourly: hourly_tx,
        },
        Views {
            static_info: static_rx,
            dynamic: dynamic_rx,
            uptime: uptime_rx,
            throughput: window_rx,
            stream_status: status_rx,
            daily: daily_rx,
            hourly: hourly_rx,
            top_limit,
        },
    )
}

pub struct Session {
    views: Views,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Session {
    /// Spawn all producers. Must be called inside a tokio runtime.
    pub fn start(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let api = ApiClient::new(
            &settings.http_base,
            settings.tls_ca.as_deref(),
            settings.request_timeout,
        )?;
        let tls = match settings.tls_ca.as_deref() {
            Some(path) if settings.ws_url.scheme() == "wss" => Some(tls_config(path)?),
            _ => None,
        };

        let (cells, views) = cells(settings.window_capacity, settings.top_processes);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let static_api = api.clone();
        tasks.push((
            "static",
            spawn_static_loader(
                "static",
                move || {
                    let api = static_api.clone();
                    async move { api.static_info().await }.boxed()
                },
                cells.static_info,
                shutdown_rx.clone(),
            ),
        ));

        tasks.push((
            "uptime",
            spawn_uptime_clock(
                views.static_info.clone(),
                cells.uptime,
                settings.uptime_tick,
                shutdown_rx.clone(),
            ),
        ));

        let poll = PollSettings {
            interval: settings.poll_interval,
            ordering: settings.ordering,
        };
        let dyn_api = api.clone();
        tasks.push((
            "dynamic",
            spawn_poller(
                "dynamic",
                move || {
                    let api = dyn_api.clone();
                    async move { api.dynamic().await }.boxed()
                },
                poll,
                cells.dynamic,
                shutdown_rx.clone(),
            ),
        ));

        if let Some(every) = settings.traffic_interval {
            let traffic = PollSettings {
                interval: every,
                ordering: settings.ordering,
            };
            let daily_api = api.clone();
            tasks.push((
                "daily",
                spawn_poller(
                    "daily",
                    move || {
                        let api = daily_api.clone();
                        async move { api.daily().await }.boxed()
                    },
                    traffic,
                    cells.daily,
                    shutdown_rx.clone(),
                ),
            ));
            let hourly_api = api.clone();
            tasks.push((
                "hourly",
                spawn_poller(
                    "hourly",
                    move || {
                        let api = hourly_api.clone();
                        async move { api.hourly().await }.boxed()
                    },
                    traffic,
                    cells.hourly,
                    shutdown_rx.clone(),
                ),
            ));
        }

        tasks.push((
            "network",
            spawn_network_stream(
                StreamSettings {
                    url: settings.ws_url.clone(),
                    tls,
                    reconnect: settings.reconnect,
                },
                cells.throughput,
                cells.stream_status,
                shutdown_rx,
            ),
        ));

        info!(
            http = %settings.http_base,
            ws = %settings.ws_url,
            tasks = tasks.len(),
            "session started"
        );
        Ok(Self {
            views,
            shutdown,
            tasks,
        })
    }

    pub fn views(&self) -> Views {
        self.views.clone()
    }

    /// Signal every producer to stop, then wait for them. Writes that land
    /// after this point are no-ops.
    pub async fn teardown(self) {
        self.shutdown.send_replace(true);
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                debug!(task = name, error = %e, "task ended abnormally");
            }
        }
        info!("session stopped");
    }
}
