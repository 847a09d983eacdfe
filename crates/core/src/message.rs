//! Channel messages exchanged with the door controller
//!
//! Inbound payloads are loosely shaped JSON objects; they are wrapped in an
//! [`Envelope`] whose `origin` is decided once, from the `source` field, so
//! the server can drop its own broadcasts with a typed check.
//!
//! ```text
//! tap     { "nfc_uid": "A3A0264E", "s3_key": "A3A0264E_20240105.jpg" }
//! tamper  { "event": "tamper", "s3_key": "TAMPER_20240105.jpg", "timestamp": 1704456000.0 }
//! image   { "s3_key": "snap.jpg" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};

use crate::decision::{AccessDecision, WireAccess};
use crate::error::{CoreError, CoreResult};

/// Alert text carried by tamper acknowledgements
pub const TAMPER_ALERT_TEXT: &str = "Tamper detected!";

/// Who produced a channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Origin {
    /// Anything not tagged by the server
    Device,
    /// Access decision published by the server
    ServerDecision,
    /// Tamper acknowledgement published by the server
    ServerTamperAck,
}

impl Origin {
    /// Interpret a `source` field; unrecognised tags count as device traffic
    pub fn from_source(source: &str) -> Self {
        source.parse().unwrap_or(Origin::Device)
    }

    /// Whether the server itself published the message
    pub fn is_server(&self) -> bool {
        !matches!(self, Origin::Device)
    }
}

/// Inbound message with its origin resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub body: Map<String, Value>,
}

impl Envelope {
    /// Wrap a decoded JSON value
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(body) = value else {
            return Err(CoreError::NotAnObject);
        };
        let origin = body
            .get("source")
            .and_then(Value::as_str)
            .map(Origin::from_source)
            .unwrap_or(Origin::Device);
        Ok(Self { origin, body })
    }

    /// Decode and wrap a JSON text payload
    pub fn from_json(text: &str) -> CoreResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CoreError::invalid("payload", e.to_string()))?;
        Self::from_value(value)
    }

    /// Server echoes must never be processed again
    pub fn is_self_originated(&self) -> bool {
        self.origin.is_server()
    }

    /// The payload as received
    pub fn raw(&self) -> Value {
        Value::Object(self.body.clone())
    }

    /// Route the payload by shape
    ///
    /// A token field wins over a tamper marker; anything else with a
    /// snapshot key is an image-only message.
    pub fn classify(&self, received_at: DateTime<Utc>) -> CoreResult<ChannelMessage> {
        if self.body.contains_key("nfc_uid") {
            let token = match self.body.get("nfc_uid") {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::String(_)) | Some(Value::Null) => {
                    return Err(CoreError::MissingField("nfc_uid"))
                }
                Some(other) => {
                    return Err(CoreError::invalid(
                        "nfc_uid",
                        format!("expected string, got {other}"),
                    ))
                }
                None => return Err(CoreError::MissingField("nfc_uid")),
            };
            return Ok(ChannelMessage::Tap(TapEvent {
                token,
                snapshot_key: self.snapshot_key(),
                at: received_at,
            }));
        }

        if self.body.get("event").and_then(Value::as_str) == Some("tamper") {
            let triggered_at = match self.body.get("timestamp") {
                Some(Value::Number(n)) => {
                    let secs = n
                        .as_f64()
                        .ok_or_else(|| CoreError::invalid("timestamp", "not a finite number"))?;
                    DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64)
                        .ok_or_else(|| CoreError::invalid("timestamp", "out of range"))?
                }
                Some(Value::Null) | None => received_at,
                Some(other) => {
                    return Err(CoreError::invalid(
                        "timestamp",
                        format!("expected number, got {other}"),
                    ))
                }
            };
            return Ok(ChannelMessage::Tamper(TamperEvent {
                snapshot_key: self.snapshot_key(),
                triggered_at,
            }));
        }

        match self.snapshot_key() {
            Some(key) => Ok(ChannelMessage::Image { key }),
            None => Ok(ChannelMessage::Other),
        }
    }

    fn snapshot_key(&self) -> Option<String> {
        self.body
            .get("s3_key")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// A tap of a physical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapEvent {
    pub token: String,
    /// Remote key of the snapshot taken at tap time
    pub snapshot_key: Option<String>,
    pub at: DateTime<Utc>,
}

impl TapEvent {
    pub fn new(token: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            snapshot_key: None,
            at,
        }
    }

    pub fn with_snapshot(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = Some(key.into());
        self
    }
}

/// A tamper switch trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TamperEvent {
    pub snapshot_key: Option<String>,
    pub triggered_at: DateTime<Utc>,
}

/// Classified inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Tap(TapEvent),
    Tamper(TamperEvent),
    /// Snapshot without decision logic
    Image { key: String },
    /// Nothing to act on beyond raw fan-out
    Other,
}

/// Decision relayed to the door controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMessage {
    pub access: WireAccess,
    pub uid: String,
    pub label: String,
    pub source: Origin,
}

impl DecisionMessage {
    pub fn new(uid: impl Into<String>, label: impl Into<String>, decision: AccessDecision) -> Self {
        Self {
            access: decision.wire(),
            uid: uid.into(),
            label: label.into(),
            source: Origin::ServerDecision,
        }
    }
}

/// Acknowledgement of a recorded tamper event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperAck {
    pub tamper_id: String,
    pub alert: String,
    pub source: Origin,
}

impl TamperAck {
    pub fn new(tamper_id: impl Into<String>) -> Self {
        Self {
            tamper_id: tamper_id.into(),
            alert: TAMPER_ALERT_TEXT.to_string(),
            source: Origin::ServerTamperAck,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
    }

    fn classify(value: Value) -> CoreResult<ChannelMessage> {
        Envelope::from_value(value)?.classify(now())
    }

    #[test]
    fn test_origin_from_source() {
        assert_eq!(Origin::from_source("server_decision"), Origin::ServerDecision);
        assert_eq!(Origin::from_source("server_tamper_ack"), Origin::ServerTamperAck);
        assert_eq!(Origin::from_source("pi-nfc"), Origin::Device);
    }

    #[test]
    fn test_envelope_detects_own_broadcast() {
        let decision = DecisionMessage::new("A1", "Fob 1", AccessDecision::Granted);
        let value = serde_json::to_value(&decision).unwrap();
        let envelope = Envelope::from_value(value).unwrap();
        assert!(envelope.is_self_originated());

        let ack = serde_json::to_value(TamperAck::new("t-1")).unwrap();
        assert!(Envelope::from_value(ack).unwrap().is_self_originated());

        let device = Envelope::from_value(json!({"nfc_uid": "A1"})).unwrap();
        assert!(!device.is_self_originated());
    }

    #[test]
    fn test_envelope_rejects_non_object() {
        assert_eq!(
            Envelope::from_value(json!(["nfc_uid"])).unwrap_err(),
            CoreError::NotAnObject
        );
        assert!(Envelope::from_json("{not json").is_err());
    }

    #[test]
    fn test_classify_tap_with_snapshot() {
        let msg = classify(json!({"nfc_uid": "A3A0264E", "s3_key": "snap.jpg"})).unwrap();
        assert_eq!(
            msg,
            ChannelMessage::Tap(TapEvent::new("A3A0264E", now()).with_snapshot("snap.jpg"))
        );
    }

    #[test]
    fn test_classify_tap_null_snapshot() {
        let msg = classify(json!({"nfc_uid": "A1", "s3_key": null})).unwrap();
        assert_eq!(msg, ChannelMessage::Tap(TapEvent::new("A1", now())));
    }

    #[test]
    fn test_classify_tap_missing_token() {
        assert_eq!(
            classify(json!({"nfc_uid": ""})).unwrap_err(),
            CoreError::MissingField("nfc_uid")
        );
        assert_eq!(
            classify(json!({"nfc_uid": null})).unwrap_err(),
            CoreError::MissingField("nfc_uid")
        );
        assert!(classify(json!({"nfc_uid": 42})).is_err());
    }

    #[test]
    fn test_classify_tamper() {
        let msg = classify(json!({
            "event": "tamper",
            "s3_key": "TAMPER_1.jpg",
            "timestamp": 1704456000.5
        }))
        .unwrap();
        match msg {
            ChannelMessage::Tamper(event) => {
                assert_eq!(event.snapshot_key.as_deref(), Some("TAMPER_1.jpg"));
                assert_eq!(event.triggered_at.timestamp(), 1704456000);
            }
            other => panic!("expected tamper, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_tamper_without_timestamp_uses_receipt_time() {
        match classify(json!({"event": "tamper"})).unwrap() {
            ChannelMessage::Tamper(event) => {
                assert_eq!(event.triggered_at, now());
                assert!(event.snapshot_key.is_none());
            }
            other => panic!("expected tamper, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_image_and_other() {
        assert_eq!(
            classify(json!({"s3_key": "img.jpg"})).unwrap(),
            ChannelMessage::Image {
                key: "img.jpg".to_string()
            }
        );
        assert_eq!(
            classify(json!({"type": "heartbeat_response"})).unwrap(),
            ChannelMessage::Other
        );
    }

    #[test]
    fn test_decision_message_wire_shape() {
        let msg = DecisionMessage::new("A1", "Fob 1", AccessDecision::GrantedWithoutFaceCheck);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "access": "granted_no_face",
                "uid": "A1",
                "label": "Fob 1",
                "source": "server_decision"
            })
        );
    }

    #[test]
    fn test_tamper_ack_wire_shape() {
        assert_eq!(
            serde_json::to_value(TamperAck::new("t-9")).unwrap(),
            json!({
                "tamper_id": "t-9",
                "alert": "Tamper detected!",
                "source": "server_tamper_ack"
            })
        );
    }
}
