//! Types that mirror the backend's JSON schema, plus the samples the pipeline derives.
//! Field names follow the wire; `_bytes` spellings are accepted as aliases.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StaticInfo {
    pub os_version: String,
    pub cpu_info: String,
    // psutil reports null when the core count cannot be determined
    #[serde(default)]
    pub cpu_cores: Option<u32>,
    #[serde(default)]
    pub cpu_logical_cores: Option<u32>,
    #[serde(default)]
    pub gpu_cores: Option<u32>,
    #[serde(rename = "total_memory", alias = "total_memory_bytes")]
    pub total_memory_bytes: u64,
    #[serde(rename = "total_disk", alias = "total_disk_bytes", default)]
    pub total_disk_bytes: u64,
    #[serde(default)]
    pub local_ip: Option<String>,
    #[serde(deserialize_with = "de_boot_time")]
    pub boot_time: DateTime<Utc>,
    // Server-side uptime at response time; only used until the first clock tick.
    #[serde(default)]
    pub uptime_seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Process {
    pub pid: i64,
    /// Empty when the backend was denied access to the process name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpu_percent: f64,
    #[serde(
        rename = "memory_rss",
        alias = "memory_rss_bytes",
        default,
        deserialize_with = "null_as_default"
    )]
    pub memory_rss_bytes: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DynamicSnapshot {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    #[serde(rename = "memory_used", alias = "memory_used_bytes", default)]
    pub memory_used_bytes: u64,
    #[serde(default)]
    pub disk_percent: f64,
    #[serde(rename = "disk_used", alias = "disk_used_bytes", default)]
    pub disk_used_bytes: u64,
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub load_average: LoadAverage,
    #[serde(default)]
    pub gpu_percent: Option<f64>,
}

/// One inbound stream message. Backends either push cumulative counters
/// (client derives rates) or precomputed rates.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum NetMessage {
    Counters { bytes_sent: u64, bytes_recv: u64 },
    Rates { up_bps: f64, down_bps: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReading {
    /// Arrival time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Instantaneous throughput in bytes per second, never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rate {
    pub download_bps: f64,
    pub upload_bps: f64,
}

impl Rate {
    pub fn clamped(download_bps: f64, upload_bps: f64) -> Self {
        // f64::max ignores NaN, so a NaN rate also lands on zero
        Self {
            download_bps: download_bps.max(0.0),
            upload_bps: upload_bps.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThroughputSample {
    pub sequence_index: u64,
    pub download_bps: f64,
    pub upload_bps: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DailyTraffic {
    pub date: String,
    pub up_bytes: u64,
    pub down_bytes: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct SinceBootTraffic {
    pub up_bytes: u64,
    pub down_bytes: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DailyReport {
    // newest first on the wire
    pub daily_7d: Vec<DailyTraffic>,
    #[serde(default)]
    pub since_boot: Option<SinceBootTraffic>,
}

impl DailyReport {
    pub fn oldest_first(&self) -> impl Iterator<Item = &DailyTraffic> {
        self.daily_7d.iter().rev()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct HourlyPoint {
    pub offset_min: i64,
    #[serde(default)]
    pub up_bps: f64,
    #[serde(default)]
    pub down_bps: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HourlyReport {
    #[serde(default)]
    pub interval_min: u32,
    // most recent first on the wire
    pub points: Vec<HourlyPoint>,
}

impl HourlyReport {
    pub fn oldest_first(&self) -> impl Iterator<Item = &HourlyPoint> {
        self.points.iter().rev()
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BootTimeRepr {
    Epoch(i64),
    Text(String),
}

fn de_boot_time<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match BootTimeRepr::deserialize(d)? {
        BootTimeRepr::Epoch(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("boot_time out of range: {secs}"))),
        BootTimeRepr::Text(s) => parse_boot_time(&s).map_err(serde::de::Error::custom),
    }
}

/// Accepts RFC 3339 with an offset, or a naive ISO-8601 timestamp in local time.
pub fn parse_boot_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("unrecognised boot_time {s:?}: {e}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("boot_time {s:?} does not exist in the local time zone"))
}
