//! HostLock Bus - message channel and live stream
//!
//! - [`MessageChannel`]: pub/sub shared with edge devices (in-process
//!   [`LocalChannel`] over tokio broadcast)
//! - [`LiveStream`]: fan-out of JSON events to dashboard subscribers

pub mod channel;
pub mod error;
pub mod live;

pub use channel::{ChannelSubscription, LocalChannel, MessageChannel, DEFAULT_CHANNEL_CAPACITY};
pub use error::{BusError, BusResult};
pub use live::{LiveStream, DEFAULT_LIVE_CAPACITY};
