use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP protocol error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("medical data request failed, status code: {status}")]
    MedicalLookup { status: u16 },

    #[error("emergency info request failed, status code: {status}: {body}")]
    EmergencyQuery { status: u16, body: String },

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool arguments: {0}")]
    InvalidToolArgs(String),

    #[error("realtime channel rejected subscribe: {0}")]
    SubscribeRejected(String),

    #[error("the connection was closed unexpectedly")]
    ConnectionClosed,

    #[error("capability error: {0}")]
    Capability(String),
}

pub type Result<T> = std::result::Result<T, Error>;
