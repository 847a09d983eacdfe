//! Bus errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to publish on {channel}: {reason}")]
    PublishFailed { channel: String, reason: String },

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

pub type BusResult<T> = Result<T, BusError>;
