use std::time::Duration;
use thiserror::Error;

/// Ошибки согласования сессии
#[derive(Debug, Error)]
pub enum NegotiatorError {
    #[error("media acquisition failed: {0}")]
    MediaAcquisition(String),

    #[error("display capture failed: {0}")]
    DisplayCapture(String),

    #[error("display capture is already active")]
    DisplayCaptureActive,

    #[error("no local description has been committed")]
    NoLocalDescription,

    #[error("invalid ICE server config: {0}")]
    InvalidServer(String),

    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload exceeds {limit} bytes after decompression")]
    PayloadTooLarge { limit: u64 },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("negotiation endpoint: {0}")]
    Endpoint(String),

    #[error("{step} timed out after {after:?}")]
    Timeout { step: &'static str, after: Duration },

    #[error("{0} cancelled")]
    Cancelled(&'static str),
}

pub type Result<T> = std::result::Result<T, NegotiatorError>;
