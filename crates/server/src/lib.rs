//! HostLock Server - CLI commands and HTTP surface

pub mod commands;
pub mod http;

pub use http::{authorize, router, serve_until, AppState, BridgeAccess, ChannelParams};
