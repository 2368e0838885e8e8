use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JanitorError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("remote call error: {0}")]
    RemoteCall(String),
    #[error("missing attribute {attribute} for {queue_url}")]
    MissingAttribute {
        queue_url: String,
        attribute: String,
    },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("cursor out of range: {0}")]
    OutOfRange(String),
    #[error("terminal surface error: {0}")]
    Surface(String),
    #[error("fetch cancelled for {0}")]
    Cancelled(String),
    #[error("purge channel closed")]
    PurgeChannelClosed,
}
