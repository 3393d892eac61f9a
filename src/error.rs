use thiserror::Error;

/// Errors that abort a whole patch or bind call. Per-request misses are not errors.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid container structure: missing {0}")]
    MissingPart(String),

    #[error("invalid container structure: {0:#}")]
    Container(anyhow::Error),

    #[error("{part} is not valid UTF-8")]
    Encoding { part: String },

    #[error("{part} is not well-formed XML: {reason:#}")]
    Xml { part: String, reason: anyhow::Error },

    #[error("config error: {0:#}")]
    Config(anyhow::Error),

    #[error("template error: {0}")]
    Template(String),

    #[error("oracle response error: {0}")]
    Oracle(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PatchError>;
