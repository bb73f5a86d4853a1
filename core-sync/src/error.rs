use bridge_traits::BridgeError;
use core_metadata::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Reading statistics unavailable: {0}")]
    Statistics(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
