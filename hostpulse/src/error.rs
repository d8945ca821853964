//! Error type shared by the pipeline: transport, protocol and configuration failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PipelineError::Config(msg.into())
    }

    /// Network-level failure; the affected state keeps its last value.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PipelineError::Http(_)
                | PipelineError::Status { .. }
                | PipelineError::WebSocket(_)
                | PipelineError::Io(_)
        )
    }

    /// Payload arrived but did not match the expected schema.
    pub fn is_protocol(&self) -> bool {
        matches!(self, PipelineError::Protocol(_))
    }
}

impl From<rustls::Error> for PipelineError {
    fn from(e: rustls::Error) -> Self {
        PipelineError::Tls(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
