// Human and machine renderings of extraction outcomes. Presentation only.

use std::fmt::Write as _;

use serde_json::json;

use super::schema::{FieldKind, SchemaRegistry};
use super::types::{ExtractionFailure, ExtractionResult};

pub fn render_result_text(result: &ExtractionResult) -> String {
    let mut out = String::new();
    push_raw(&mut out, &result.raw);

    let _ = writeln!(out, "\nAccepted events ({}):", result.accepted.len());
    for event in &result.accepted {
        let _ = writeln!(out, "  {event}");
    }

    if !result.rejected.is_empty() {
        let _ = writeln!(out, "\nRejected entries ({}):", result.rejected.len());
        for entry in &result.rejected {
            let _ = writeln!(out, "  [{}] {}", entry.index, entry.reason);
            let _ = writeln!(out, "      {}", entry.candidate);
        }
    }

    if !result.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &result.warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }

    out
}

pub fn render_failure_text(failure: &ExtractionFailure) -> String {
    let mut out = String::new();
    match &failure.raw {
        Some(raw) => push_raw(&mut out, raw),
        None => out.push_str("No response received from model.\n"),
    }
    let _ = writeln!(out, "\nFailed to extract events: {}", failure.error);
    out
}

pub fn render_result_json(result: &ExtractionResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "status": "ok",
        "result": result,
    }))
}

pub fn render_failure_json(failure: &ExtractionFailure) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "status": "failed",
        "extraction_id": failure.extraction_id,
        "error": failure.error.to_string(),
        "batch_level": failure.error.is_batch_level(),
        "raw": failure.raw,
    }))
}

/// One block per schema: discriminant, then `name: kind` lines.
pub fn render_schemas_text(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    for schema in registry.schemas() {
        let _ = writeln!(out, "{}", schema.event_type);
        for field in schema.fields {
            let marker = if field.required { "" } else { " (optional)" };
            let _ = writeln!(out, "  {}: {}{marker}", field.name, field.kind.describe());
            if let FieldKind::Object(nested) = field.kind {
                for inner in nested {
                    let _ = writeln!(out, "    {}: {}", inner.name, inner.kind.describe());
                }
            }
        }
    }
    out
}

fn push_raw(out: &mut String, raw: &str) {
    out.push_str("Raw model response:\n");
    out.push_str(raw.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::orchestrator::process_response;
    use crate::pipeline::structuring::ExtractionError;
    use uuid::Uuid;

    fn sample_result() -> ExtractionResult {
        let raw = r#"[
            {"eventType": "supportNeeded", "timestamp": "2024-03-20T14:32:00Z",
             "requestId": "support_789", "priority": "urgent", "location": [1, 2, 3],
             "status": "pending"},
            {"eventType": "locationChanged", "timestamp": "2024-03-20T14:30:05Z",
             "objectId": "robot_A1", "previousPosition": [0, 0, 0], "newPosition": [1.2, 0, 3.4]}
        ]"#;
        process_response(Uuid::new_v4(), raw.to_string(), &SchemaRegistry::builtin()).unwrap()
    }

    #[test]
    fn text_report_shows_raw_accepted_and_rejected() {
        let text = render_result_text(&sample_result());
        assert!(text.starts_with("Raw model response:\n["));
        assert!(text.contains("Accepted events (1):"));
        assert!(text.contains("  locationChanged {"));
        assert!(text.contains("Rejected entries (1):"));
        assert!(text.contains("[0] field `priority`"));
    }

    #[test]
    fn text_report_omits_empty_sections() {
        let result = process_response(Uuid::new_v4(), "[]".into(), &SchemaRegistry::builtin())
            .unwrap();
        let text = render_result_text(&result);
        assert!(text.contains("Accepted events (0):"));
        assert!(!text.contains("Rejected entries"));
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn failure_report_includes_raw_when_present() {
        let failure = ExtractionFailure {
            extraction_id: Uuid::new_v4(),
            raw: Some("no events here".into()),
            error: ExtractionError::NoJsonArrayFound,
        };
        let text = render_failure_text(&failure);
        assert!(text.contains("no events here"));
        assert!(text.contains("Failed to extract events: No JSON array found"));
    }

    #[test]
    fn failure_report_without_raw() {
        let failure = ExtractionFailure {
            extraction_id: Uuid::new_v4(),
            raw: None,
            error: ExtractionError::OllamaConnection("http://localhost:11434".into()),
        };
        let text = render_failure_text(&failure);
        assert!(text.starts_with("No response received from model."));
    }

    #[test]
    fn json_report_is_machine_readable() {
        let json = render_result_json(&sample_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["result"]["accepted"][0]["objectId"], "robot_A1");
        assert_eq!(value["result"]["rejected"][0]["reason"]["kind"], "invalid_enum_value");
        assert_eq!(value["result"]["rejected"][0]["reason"]["field"], "priority");
    }

    #[test]
    fn json_failure_flags_batch_level() {
        let failure = ExtractionFailure {
            extraction_id: Uuid::new_v4(),
            raw: Some("{}".into()),
            error: ExtractionError::NotAnArray("object"),
        };
        let value: serde_json::Value =
            serde_json::from_str(&render_failure_json(&failure).unwrap()).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["batch_level"], true);
        assert_eq!(value["raw"], "{}");
    }

    #[test]
    fn schema_listing_marks_optional_fields() {
        let text = render_schemas_text(&SchemaRegistry::builtin());
        assert!(text.contains("detection\n  timestamp: ISO-8601 timestamp string\n"));
        assert!(text.contains("  velocity: array of 3 numbers (optional)"));
        assert!(text.contains("    width: integer"));
        assert!(text.contains("  priority: one of [low, medium, high]\n"));
    }
}
