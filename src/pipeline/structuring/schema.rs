// Event schemas the model is asked to target, mirrored from the prompt template.
// Static data: the registry is built once and only ever read.

use std::collections::HashSet;

use serde::Serialize;

use super::types::RejectionReason;
use super::ExtractionError;

/// Shape constraint for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    String,
    /// Any JSON number.
    Float,
    /// Integral JSON number.
    Int,
    /// Float within `[0.0, 1.0]`.
    UnitInterval,
    /// RFC 3339 / ISO-8601 instant, e.g. `2024-03-20T14:30:00.000Z`.
    IsoTimestamp,
    /// Numeric sequence of exactly `arity` elements.
    NumberArray { arity: usize },
    Object(&'static [FieldSpec]),
    /// Case-sensitive set of allowed literals.
    Enum(&'static [&'static str]),
}

/// Fixed 3-element position/velocity vector.
pub const FLOAT3: FieldKind = FieldKind::NumberArray { arity: 3 };

impl FieldKind {
    /// Short human-readable description, used in rejection reasons.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::String => "string".into(),
            FieldKind::Float => "number".into(),
            FieldKind::Int => "integer".into(),
            FieldKind::UnitInterval => "number in [0, 1]".into(),
            FieldKind::IsoTimestamp => "ISO-8601 timestamp string".into(),
            FieldKind::NumberArray { arity } => format!("array of {arity} numbers"),
            FieldKind::Object(_) => "object".into(),
            FieldKind::Enum(allowed) => format!("one of [{}]", allowed.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSchema {
    /// Value of the `eventType` discriminant.
    pub event_type: &'static str,
    pub fields: &'static [FieldSpec],
}

impl EventSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First timestamp field, used to order events within a batch.
    pub fn timestamp_field(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::IsoTimestamp)
            .map(|f| f.name)
    }
}

/// Name of the discriminant key in every event object.
pub const DISCRIMINANT_FIELD: &str = "eventType";

pub const PRIORITY_VALUES: &[&str] = &["low", "medium", "high"];

pub const SUPPORT_STATUS_VALUES: &[&str] =
    &["pending", "acknowledged", "inProgress", "resolved", "cancelled"];

const BOUNDING_BOX_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("x", FieldKind::Int),
    FieldSpec::required("y", FieldKind::Int),
    FieldSpec::required("width", FieldKind::Int),
    FieldSpec::required("height", FieldKind::Int),
];

pub const DETECTION_SCHEMA: EventSchema = EventSchema {
    event_type: "detection",
    fields: &[
        FieldSpec::required("timestamp", FieldKind::IsoTimestamp),
        FieldSpec::required("objectId", FieldKind::String),
        FieldSpec::required("confidence", FieldKind::UnitInterval),
        FieldSpec::required("position", FLOAT3),
        FieldSpec::optional("classification", FieldKind::String),
        FieldSpec::optional("boundingBox", FieldKind::Object(BOUNDING_BOX_FIELDS)),
    ],
};

pub const LOCATION_CHANGED_SCHEMA: EventSchema = EventSchema {
    event_type: "locationChanged",
    fields: &[
        FieldSpec::required("timestamp", FieldKind::IsoTimestamp),
        FieldSpec::required("objectId", FieldKind::String),
        FieldSpec::required("previousPosition", FLOAT3),
        FieldSpec::required("newPosition", FLOAT3),
        FieldSpec::optional("velocity", FLOAT3),
    ],
};

pub const SPEECH_SCHEMA: EventSchema = EventSchema {
    event_type: "speech",
    fields: &[
        FieldSpec::required("timestamp", FieldKind::IsoTimestamp),
        FieldSpec::required("speakerId", FieldKind::String),
        FieldSpec::required("content", FieldKind::String),
        FieldSpec::required("confidence", FieldKind::UnitInterval),
        FieldSpec::optional("language", FieldKind::String),
        FieldSpec::optional("duration", FieldKind::Float),
    ],
};

pub const SUPPORT_NEEDED_SCHEMA: EventSchema = EventSchema {
    event_type: "supportNeeded",
    fields: &[
        FieldSpec::required("timestamp", FieldKind::IsoTimestamp),
        FieldSpec::required("requestId", FieldKind::String),
        FieldSpec::required("priority", FieldKind::Enum(PRIORITY_VALUES)),
        FieldSpec::required("location", FLOAT3),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::optional("requesterType", FieldKind::String),
        FieldSpec::required("status", FieldKind::Enum(SUPPORT_STATUS_VALUES)),
    ],
};

static BUILTIN_SCHEMAS: &[EventSchema] = &[
    DETECTION_SCHEMA,
    LOCATION_CHANGED_SCHEMA,
    SPEECH_SCHEMA,
    SUPPORT_NEEDED_SCHEMA,
];

/// Immutable lookup table from discriminant to schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    schemas: &'static [EventSchema],
}

impl SchemaRegistry {
    /// The four event kinds of the extraction prompt.
    pub fn builtin() -> Self {
        Self { schemas: BUILTIN_SCHEMAS }
    }

    /// Build a registry from a custom schema set. Discriminants must be unique.
    pub fn new(schemas: &'static [EventSchema]) -> Result<Self, ExtractionError> {
        let mut seen = HashSet::new();
        for schema in schemas {
            if !seen.insert(schema.event_type) {
                return Err(ExtractionError::DuplicateEventType(
                    schema.event_type.to_string(),
                ));
            }
        }
        Ok(Self { schemas })
    }

    pub fn lookup(&self, event_type: &str) -> Result<&'static EventSchema, RejectionReason> {
        self.schemas
            .iter()
            .find(|s| s.event_type == event_type)
            .ok_or_else(|| RejectionReason::UnknownEventType {
                event_type: event_type.to_string(),
            })
    }

    pub fn schemas(&self) -> &'static [EventSchema] {
        self.schemas
    }

    pub fn event_types(&self) -> impl Iterator<Item = &'static str> {
        self.schemas.iter().map(|s| s.event_type)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
