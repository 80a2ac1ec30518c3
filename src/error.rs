use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Maximum reconnection attempts exceeded")]
    RetriesExhausted,

    #[error("Invalid update frame: {0}")]
    InvalidFrame(String),

    #[error("Event channel send error: {0}")]
    EventSendError(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}
