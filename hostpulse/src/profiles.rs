//! Connection profiles and effective settings.
//! Profiles are a JSON mapping of name -> { url, ws_url, tls_ca, ... } stored under
//! $XDG_CONFIG_HOME/hostpulse/profiles.json (fallback: platform config dir).

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf, time::Duration};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::history::DEFAULT_WINDOW;
use crate::poller::ResponseOrdering;
use crate::ranker::DEFAULT_TOP;
use crate::ws::Backoff;

pub const DEFAULT_HTTP_BASE: &str = "http://127.0.0.1:8000/";
pub const DEFAULT_WS_PATH: &str = "ws/network";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("hostpulse")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hostpulse")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable profiles file");
            ProfilesFile::default()
        }),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> std::io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p)?;
    fs::write(path, data)
}

pub enum ResolveProfile {
    /// Use the provided runtime inputs (maybe persisted by the caller).
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry
    Loaded(ProfileEntry),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// Nothing to go on: no url, no profile, no saved profiles
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub entry: Option<ProfileEntry>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.entry, self.profile_name) {
            (Some(entry), _) => ResolveProfile::Direct(entry),
            (None, Some(name)) => match pf.profiles.get(&name) {
                Some(entry) => ResolveProfile::Loaded(entry.clone()),
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if pf.profiles.is_empty() => ResolveProfile::None,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}

/// Every tunable of a session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub http_base: Url,
    pub ws_url: Url,
    pub tls_ca: Option<PathBuf>,
    pub poll_interval: Duration,
    pub uptime_tick: Duration,
    pub window_capacity: usize,
    pub top_processes: usize,
    /// Daily/hourly traffic summaries; `None` turns those feeds off.
    pub traffic_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub ordering: ResponseOrdering,
    pub reconnect: Option<Backoff>,
}

impl Settings {
    pub fn new(http_base: Url) -> Result<Self> {
        let ws_url = derive_ws_url(&http_base)?;
        Ok(Self {
            http_base,
            ws_url,
            tls_ca: None,
            poll_interval: Duration::from_secs(2),
            uptime_tick: Duration::from_secs(1),
            window_capacity: DEFAULT_WINDOW,
            top_processes: DEFAULT_TOP,
            traffic_interval: Some(Duration::from_secs(30)),
            request_timeout: Duration::from_secs(5),
            ordering: ResponseOrdering::default(),
            reconnect: Some(Backoff::default()),
        })
    }

    /// Start from defaults and apply a profile entry's fields.
    pub fn from_entry(entry: &ProfileEntry) -> Result<Self> {
        let mut s = Self::new(parse_http_base(&entry.url)?)?;
        if let Some(ws) = entry.ws_url.as_deref() {
            s.ws_url = Url::parse(ws)?;
        }
        s.tls_ca = entry.tls_ca.as_ref().map(PathBuf::from);
        if let Some(ms) = entry.poll_interval_ms {
            s.poll_interval = Duration::from_millis(ms);
        }
        if let Some(cap) = entry.window_capacity {
            s.window_capacity = cap;
        }
        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.http_base.scheme(), "http" | "https") {
            return Err(PipelineError::config(format!(
                "http base must be http:// or https://, got {}",
                self.http_base
            )));
        }
        if !matches!(self.ws_url.scheme(), "ws" | "wss") {
            return Err(PipelineError::config(format!(
                "stream url must be ws:// or wss://, got {}",
                self.ws_url
            )));
        }
        if self.poll_interval.is_zero() || self.uptime_tick.is_zero() {
            return Err(PipelineError::config("intervals must be greater than zero"));
        }
        if self.traffic_interval.is_some_and(|d| d.is_zero()) {
            return Err(PipelineError::config("traffic interval must be greater than zero"));
        }
        if self.window_capacity == 0 {
            return Err(PipelineError::config("window capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Accepts `host:port` shorthand as well as full http(s) URLs.
pub fn parse_http_base(s: &str) -> Result<Url> {
    let s = s.trim();
    if s.contains("://") {
        Ok(Url::parse(s)?)
    } else {
        Ok(Url::parse(&format!("http://{s}"))?)
    }
}

/// http://host:port/prefix -> ws://host:port/prefix/ws/network (https -> wss).
pub fn derive_ws_url(http_base: &Url) -> Result<Url> {
    let mut ws = http_base.clone();
    let scheme = match http_base.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    ws.set_scheme(scheme)
        .map_err(|_| PipelineError::config(format!("cannot derive stream url from {http_base}")))?;
    let prefix = http_base.path().trim_end_matches('/');
    ws.set_path(&format!("{prefix}/{DEFAULT_WS_PATH}"));
    ws.set_query(None);
    ws.set_fragment(None);
    Ok(ws)
}
