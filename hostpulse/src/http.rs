//! HTTP client for the snapshot endpoints.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{PipelineError, Result};
use crate::types::{DailyReport, DynamicSnapshot, HourlyReport, StaticInfo};

pub const STATIC_PATH: &str = "api/system/static";
pub const DYNAMIC_PATH: &str = "api/system/dynamic";
pub const DAILY_PATH: &str = "api/network/daily";
pub const HOURLY_PATH: &str = "api/network/hourly";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &Url, tls_ca: Option<&Path>, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hostpulse/", env!("CARGO_PKG_VERSION")));
        if let Some(path) = tls_ca {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| PipelineError::Tls(format!("{}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        Ok(Self {
            http: builder.build()?,
            base: normalize_base(base),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn static_info(&self) -> Result<StaticInfo> {
        self.get_json(STATIC_PATH).await
    }

    pub async fn dynamic(&self) -> Result<DynamicSnapshot> {
        self.get_json(DYNAMIC_PATH).await
    }

    pub async fn daily(&self) -> Result<DailyReport> {
        self.get_json(DAILY_PATH).await
    }

    pub async fn hourly(&self) -> Result<HourlyReport> {
        self.get_json(HOURLY_PATH).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base.join(path)?;
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                endpoint: url.path().to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        debug!(endpoint = url.path(), bytes = body.len(), "response received");
        // Decode separately so schema mismatches surface as protocol errors.
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Endpoint paths are joined relative to the base, so it must end in '/'.
fn normalize_base(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    base
}
