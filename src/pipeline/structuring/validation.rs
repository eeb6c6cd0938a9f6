// Schema validation for model-emitted events.
// Batch-level problems (not JSON, not an array) fail the whole call; anything
// wrong with a single element becomes a RejectedEntry and the rest of the
// batch is still validated.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use super::schema::{EventSchema, FieldKind, FieldSpec, SchemaRegistry, DISCRIMINANT_FIELD};
use super::types::{RejectedEntry, RejectionReason, ValidatedEvent};
use super::ExtractionError;

/// Accepted and rejected elements, each in original array order.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub accepted: Vec<ValidatedEvent>,
    pub rejected: Vec<RejectedEntry>,
}

/// Parse sanitized model text and validate every element against the registry.
pub fn validate_events(
    sanitized: &str,
    registry: &SchemaRegistry,
) -> Result<ValidationOutcome, ExtractionError> {
    let parsed: Value = serde_json::from_str(sanitized)
        .map_err(|e| ExtractionError::MalformedJson(e.to_string()))?;

    let elements = match parsed {
        Value::Array(elements) => elements,
        other => return Err(ExtractionError::NotAnArray(json_type_name(&other))),
    };

    let mut outcome = ValidationOutcome::default();
    for (index, element) in elements.into_iter().enumerate() {
        match validate_candidate(&element, registry) {
            Ok(schema) => {
                let Value::Object(fields) = element else {
                    // validate_candidate only accepts objects
                    continue;
                };
                outcome.accepted.push(ValidatedEvent::new(schema, fields));
            }
            Err(reason) => {
                tracing::debug!(index, reason = %reason, "Rejected model event");
                outcome.rejected.push(RejectedEntry {
                    index,
                    candidate: element,
                    reason,
                });
            }
        }
    }

    if !outcome.rejected.is_empty() {
        tracing::warn!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "Model events failed schema validation"
        );
    }

    Ok(outcome)
}

/// Validate one array element, returning the schema it satisfies.
pub fn validate_candidate(
    element: &Value,
    registry: &SchemaRegistry,
) -> Result<&'static EventSchema, RejectionReason> {
    let object = element.as_object().ok_or(RejectionReason::NotAnObject {
        found: json_type_name(element),
    })?;

    let event_type = object
        .get(DISCRIMINANT_FIELD)
        .and_then(Value::as_str)
        .ok_or(RejectionReason::MissingDiscriminant)?;

    let schema = registry.lookup(event_type)?;
    check_fields(object, schema.fields, "")?;
    Ok(schema)
}

/// Check every spec in declaration order. Extra keys are ignored; `null`
/// counts as absent.
fn check_fields(
    object: &Map<String, Value>,
    specs: &[FieldSpec],
    prefix: &str,
) -> Result<(), RejectionReason> {
    for spec in specs {
        let path = if prefix.is_empty() {
            spec.name.to_string()
        } else {
            format!("{prefix}.{}", spec.name)
        };

        match object.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(RejectionReason::MissingField { field: path });
                }
            }
            Some(value) => check_kind(value, &spec.kind, path)?,
        }
    }
    Ok(())
}

fn check_kind(value: &Value, kind: &FieldKind, path: String) -> Result<(), RejectionReason> {
    let mismatch = |path: String| RejectionReason::TypeMismatch {
        field: path,
        expected: kind.describe(),
        found: json_type_name(value),
    };

    match kind {
        FieldKind::String => {
            if !value.is_string() {
                return Err(mismatch(path));
            }
        }
        FieldKind::Float => {
            if !value.is_number() {
                return Err(mismatch(path));
            }
        }
        FieldKind::Int => {
            if !value.is_i64() {
                return Err(mismatch(path));
            }
        }
        FieldKind::UnitInterval => {
            let n = value.as_f64().ok_or_else(|| mismatch(path.clone()))?;
            if !(0.0..=1.0).contains(&n) {
                return Err(RejectionReason::OutOfRange { field: path, value: n });
            }
        }
        FieldKind::IsoTimestamp => {
            let s = value.as_str().ok_or_else(|| mismatch(path.clone()))?;
            if parse_timestamp(s).is_none() {
                return Err(RejectionReason::MalformedTimestamp {
                    field: path,
                    value: s.to_string(),
                });
            }
        }
        FieldKind::NumberArray { arity } => {
            let items = value.as_array().ok_or_else(|| mismatch(path.clone()))?;
            if items.len() != *arity {
                return Err(RejectionReason::WrongArity {
                    field: path,
                    expected: *arity,
                    actual: items.len(),
                });
            }
            if let Some(pos) = items.iter().position(|v| !v.is_number()) {
                return Err(RejectionReason::TypeMismatch {
                    field: format!("{path}[{pos}]"),
                    expected: "number".into(),
                    found: json_type_name(&items[pos]),
                });
            }
        }
        FieldKind::Object(fields) => {
            let nested = value.as_object().ok_or_else(|| mismatch(path.clone()))?;
            check_fields(nested, fields, &path)?;
        }
        FieldKind::Enum(allowed) => {
            let s = value.as_str().ok_or_else(|| mismatch(path.clone()))?;
            if !allowed.iter().any(|a| *a == s) {
                return Err(RejectionReason::InvalidEnumValue {
                    field: path,
                    value: s.to_string(),
                    allowed: *allowed,
                });
            }
        }
    }
    Ok(())
}

/// ISO-8601 forms accepted beyond RFC 3339: basic offsets and minute precision.
const ISO_8601_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Parse an ISO-8601 instant. An explicit offset (`Z`, `+hh:mm` or `+hhmm`)
/// is required and surrounding whitespace is not tolerated.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if s.trim() != s {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }

    // %z does not take a `Z` designator
    let offset_form = match s.strip_suffix('Z') {
        Some(base) => Cow::Owned(format!("{base}+0000")),
        None => Cow::Borrowed(s),
    };
    ISO_8601_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&offset_form, format).ok())
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Non-fatal diagnostics over the accepted batch: exact duplicates and
/// events whose timestamp goes backwards.
pub fn batch_warnings(accepted: &[ValidatedEvent]) -> Vec<String> {
    let mut warnings = Vec::new();

    for (i, event) in accepted.iter().enumerate() {
        if let Some(first) = accepted[..i].iter().position(|e| e == event) {
            warnings.push(format!(
                "Accepted event {i} ({}) duplicates event {first}",
                event.event_type()
            ));
        }
    }

    let mut latest: Option<(usize, DateTime<FixedOffset>)> = None;
    for (i, event) in accepted.iter().enumerate() {
        let Some(ts) = event_timestamp(event) else {
            continue;
        };
        match latest {
            Some((prev, prev_ts)) if ts < prev_ts => {
                warnings.push(format!(
                    "Accepted event {i} ({}) is timestamped before event {prev}",
                    event.event_type()
                ));
            }
            _ => latest = Some((i, ts)),
        }
    }

    warnings
}

fn event_timestamp(event: &ValidatedEvent) -> Option<DateTime<FixedOffset>> {
    let field = event.schema().timestamp_field()?;
    event.get(field).and_then(Value::as_str).and_then(parse_timestamp)
}
