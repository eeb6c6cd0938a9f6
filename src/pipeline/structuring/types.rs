use std::fmt;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::schema::EventSchema;
use super::ExtractionError;

/// Untyped key-value mapping decoded from one array element.
pub type CandidateEvent = Map<String, Value>;

/// Why a single array element was rejected. The first violated constraint wins.
#[derive(Error, Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("element is not a JSON object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("missing string-valued `eventType` discriminant")]
    MissingDiscriminant,

    #[error("unknown event type `{event_type}`")]
    UnknownEventType { event_type: String },

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("field `{field}`: expected exactly {expected} elements, found {actual}")]
    WrongArity {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("field `{field}`: `{value}` is not a valid ISO-8601 timestamp")]
    MalformedTimestamp { field: String, value: String },

    #[error("field `{field}`: `{value}` is not one of [{}]", .allowed.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("field `{field}`: {value} is outside [0, 1]")]
    OutOfRange { field: String, value: f64 },
}

impl RejectionReason {
    /// Dotted path of the offending field, when the reason concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            RejectionReason::NotAnObject { .. }
            | RejectionReason::MissingDiscriminant
            | RejectionReason::UnknownEventType { .. } => None,
            RejectionReason::MissingField { field }
            | RejectionReason::TypeMismatch { field, .. }
            | RejectionReason::WrongArity { field, .. }
            | RejectionReason::MalformedTimestamp { field, .. }
            | RejectionReason::InvalidEnumValue { field, .. }
            | RejectionReason::OutOfRange { field, .. } => Some(field),
        }
    }
}

/// A candidate that satisfied every field spec of its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    schema: &'static EventSchema,
    fields: CandidateEvent,
}

impl ValidatedEvent {
    pub(crate) fn new(schema: &'static EventSchema, fields: CandidateEvent) -> Self {
        Self { schema, fields }
    }

    pub fn event_type(&self) -> &'static str {
        self.schema.event_type
    }

    pub fn schema(&self) -> &'static EventSchema {
        self.schema
    }

    pub fn fields(&self) -> &CandidateEvent {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl Serialize for ValidatedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl fmt::Display for ValidatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.fields).map_err(|_| fmt::Error)?;
        write!(f, "{} {json}", self.schema.event_type)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RejectedEntry {
    /// Position in the model's array.
    pub index: usize,
    pub candidate: Value,
    pub reason: RejectionReason,
}

/// Outcome of a completed extraction: some, all or none of the elements may
/// have been accepted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionResult {
    pub extraction_id: Uuid,
    /// Unmodified model text.
    pub raw: String,
    pub accepted: Vec<ValidatedEvent>,
    pub rejected: Vec<RejectedEntry>,
    /// Non-fatal batch diagnostics (duplicates, ordering).
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Every element of the model's array was accepted.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// Extraction could not produce an array of candidates at all.
#[derive(Error, Debug)]
#[error("extraction {extraction_id} failed: {error}")]
pub struct ExtractionFailure {
    pub extraction_id: Uuid,
    /// Model text, when the model answered.
    pub raw: Option<String>,
    #[source]
    pub error: ExtractionError,
}

/// Narrow boundary to whatever produces text from a prompt.
pub trait ModelCollaborator {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// Drives a full extraction for one conversation (allows mocking).
pub trait StructuredExtractor {
    fn extract(&self, conversation_text: &str) -> Result<ExtractionResult, ExtractionFailure>;
}
