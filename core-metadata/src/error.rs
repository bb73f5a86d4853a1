use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
