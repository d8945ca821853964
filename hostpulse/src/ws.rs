//! Network counter stream: one long-lived WebSocket feeding the throughput
//! estimator and the rolling window.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, Connector, MaybeTlsStream,
    WebSocketStream,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::history::RollingWindow;
use crate::poller::stopped;
use crate::rate::ThroughputEstimator;
use crate::types::{CounterReading, NetMessage, Rate};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// Exponential reconnect delay: `initial * factor^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let mult = self.factor.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(mult)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

// Connect to the stream endpoint; a custom TLS config only matters for wss
pub async fn connect(url: &Url, tls: Option<Arc<rustls::ClientConfig>>) -> Result<WsStream> {
    let connector = tls.map(Connector::Rustls);
    let (ws, _) = connect_async_tls_with_config(url.as_str(), None, false, connector).await?;
    Ok(ws)
}

/// rustls client config trusting only the certificates in a PEM bundle.
pub fn tls_config(ca_path: &Path) -> Result<Arc<rustls::ClientConfig>> {
    let pem = std::fs::read(ca_path)?;
    let mut roots = rustls::RootCertStore::empty();
    let mut reader = std::io::BufReader::new(&pem[..]);
    for cert in rustls_pemfile::certs(&mut reader) {
        roots.add(cert?)?;
    }
    if roots.is_empty() {
        return Err(PipelineError::Tls(format!(
            "no certificates found in {}",
            ca_path.display()
        )));
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let cfg = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(cfg))
}

/// Per-connection decoding state. Pure so it can be driven with explicit
/// arrival times.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    estimator: ThroughputEstimator,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one text frame that arrived at `arrival_ms`. `Ok(None)` means the
    /// message was valid but did not yield a sample (first reading, dt <= 0).
    pub fn ingest(&mut self, text: &str, arrival_ms: i64) -> Result<Option<Rate>> {
        let msg: NetMessage = serde_json::from_str(text)?;
        Ok(self.ingest_message(msg, arrival_ms))
    }

    pub fn ingest_message(&mut self, msg: NetMessage, arrival_ms: i64) -> Option<Rate> {
        match msg {
            NetMessage::Counters {
                bytes_sent,
                bytes_recv,
            } => self.estimator.observe(CounterReading {
                timestamp_ms: arrival_ms,
                bytes_sent,
                bytes_received: bytes_recv,
            }),
            NetMessage::Rates { up_bps, down_bps } => Some(Rate::clamped(down_bps, up_bps)),
        }
    }

    /// Called on every (re)connect: never diff across a connection gap.
    pub fn reset(&mut self) {
        self.estimator.reset();
    }
}

pub struct StreamSettings {
    pub url: Url,
    pub tls: Option<Arc<rustls::ClientConfig>>,
    /// `None`: the stream ends after the first drop.
    pub reconnect: Option<Backoff>,
}

pub fn spawn_network_stream(
    settings: StreamSettings,
    window: watch::Sender<RollingWindow>,
    status: watch::Sender<StreamStatus>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_network_stream(settings, window, status, shutdown))
}

pub async fn run_network_stream(
    settings: StreamSettings,
    window: watch::Sender<RollingWindow>,
    status: watch::Sender<StreamStatus>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut decoder = StreamDecoder::new();
    let mut attempt: u32 = 0;

    loop {
        status.send_replace(StreamStatus::Connecting);
        let conn = tokio::select! {
            res = connect(&settings.url, settings.tls.clone()) => res,
            _ = stopped(&mut shutdown) => break,
        };
        match conn {
            Ok(mut ws) => {
                info!(url = %settings.url, "network stream connected");
                attempt = 0;
                decoder.reset();
                status.send_replace(StreamStatus::Connected);
                let closing = pump(&mut ws, &mut decoder, &window, &mut shutdown).await;
                if closing {
                    let _ = ws.close(None).await;
                    break;
                }
            }
            Err(e) => warn!(url = %settings.url, error = %e, "network stream connect failed"),
        }
        status.send_replace(StreamStatus::Disconnected);

        let Some(backoff) = settings.reconnect else {
            info!("network stream closed; reconnect disabled");
            break;
        };
        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        debug!(?delay, attempt, "network stream reconnect scheduled");
        tokio::select! {
            _ = sleep(delay) => {}
            _ = stopped(&mut shutdown) => break,
        }
    }
    status.send_replace(StreamStatus::Disconnected);
}

// Returns true when the session is shutting down, false when the connection dropped.
async fn pump(
    ws: &mut WsStream,
    decoder: &mut StreamDecoder,
    window: &watch::Sender<RollingWindow>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        let msg = tokio::select! {
            msg = ws.next() => msg,
            _ = stopped(shutdown) => return true,
        };
        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("dropping non-utf8 binary frame");
                    continue;
                }
            },
            Some(Ok(Message::Close(frame))) => {
                info!(?frame, "network stream closed by server");
                return false;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!(error = %e, "network stream error");
                return false;
            }
            None => return false,
        };
        if *shutdown.borrow() {
            return true;
        }
        match decoder.ingest(&text, Utc::now().timestamp_millis()) {
            Ok(Some(rate)) => {
                window.send_modify(|w| {
                    w.push(rate);
                });
            }
            Ok(None) => debug!("reading stored; waiting for the next one"),
            Err(e) => warn!(error = %e, "dropping malformed network message"),
        }
    }
}
