//! HostLock Core - domain types for the access-decision pipeline
//!
//! Everything in this crate is a plain value: no I/O, no async.
//! The store, evidence, face and engine crates build on these types.

pub mod assignment;
pub mod decision;
pub mod error;
pub mod live;
pub mod log;
pub mod message;

pub use assignment::{select_active, Assignment, ReferenceImage, Resolution, UNKNOWN_LABEL};
pub use decision::{AccessDecision, WireAccess, FACE_CONFIRMED_CONFIDENCE};
pub use error::{CoreError, CoreResult};
pub use live::LiveEvent;
pub use log::{EventCategory, LogEntry, TamperLogEntry, TamperStatus};
pub use message::{
    ChannelMessage, DecisionMessage, Envelope, Origin, TamperAck, TamperEvent, TapEvent,
    TAMPER_ALERT_TEXT,
};
