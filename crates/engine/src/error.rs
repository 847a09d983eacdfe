//! Engine errors

use hostlock_bus::BusError;
use hostlock_core::CoreError;
use hostlock_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Inbound message unusable; the channel keeps running
    #[error("Message rejected: {0}")]
    Rejected(#[from] CoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Dispatcher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
