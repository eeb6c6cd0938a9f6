use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::FieldKind;
use super::types::ValidatedEvent;
use super::validation::parse_timestamp;

/// Typed view of a validated event, tagged by `eventType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum Event {
    Detection(DetectionEvent),
    LocationChanged(LocationChangedEvent),
    Speech(SpeechEvent),
    SupportNeeded(SupportNeededEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Detection(_) => "detection",
            Event::LocationChanged(_) => "locationChanged",
            Event::Speech(_) => "speech",
            Event::SupportNeeded(_) => "supportNeeded",
        }
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        match self {
            Event::Detection(e) => e.timestamp,
            Event::LocationChanged(e) => e.timestamp,
            Event::Speech(e) => e.timestamp,
            Event::SupportNeeded(e) => e.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub object_id: String,
    pub confidence: f64,
    pub position: [f64; 3],
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationChangedEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub object_id: String,
    pub previous_position: [f64; 3],
    pub new_position: [f64; 3],
    #[serde(default)]
    pub velocity: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub speaker_id: String,
    pub content: String,
    pub confidence: f64,
    #[serde(default)]
    pub language: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportNeededEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub request_id: String,
    pub priority: Priority,
    pub location: [f64; 3],
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requester_type: Option<String>,
    pub status: SupportStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SupportStatus {
    Pending,
    Acknowledged,
    InProgress,
    Resolved,
    Cancelled,
}

impl ValidatedEvent {
    /// Decode into the typed event for this discriminant.
    /// Timestamps are normalised to RFC 3339 first.
    pub fn to_event(&self) -> Result<Event, serde_json::Error> {
        let mut fields = self.fields().clone();
        let timestamp_fields = self
            .schema()
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::IsoTimestamp);

        for spec in timestamp_fields {
            if let Some(value) = fields.get_mut(spec.name) {
                if let Some(ts) = value.as_str().and_then(parse_timestamp) {
                    *value = Value::String(ts.to_rfc3339());
                }
            }
        }
        serde_json::from_value(Value::Object(fields))
    }
}
