use thiserror::Error;

/// Errors from backend service calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service socket connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("service returned status {0}")]
    Status(hyper::StatusCode),

    #[error("invalid service payload: {0}")]
    Payload(#[from] serde_json::Error),
}
