use uuid::Uuid;

use super::prompt::build_extraction_prompt;
use super::sanitize::extract_json_array;
use super::schema::SchemaRegistry;
use super::types::{ExtractionFailure, ExtractionResult, ModelCollaborator, StructuredExtractor};
use super::validation::{batch_warnings, validate_events};
use super::ExtractionError;

/// Orchestrates the event extraction pipeline:
/// prompt → model (once) → sanitize → validate → result
pub struct EventExtractor {
    model: Box<dyn ModelCollaborator + Send + Sync>,
    registry: SchemaRegistry,
}

impl EventExtractor {
    pub fn new(model: Box<dyn ModelCollaborator + Send + Sync>) -> Self {
        Self {
            model,
            registry: SchemaRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl StructuredExtractor for EventExtractor {
    fn extract(&self, conversation_text: &str) -> Result<ExtractionResult, ExtractionFailure> {
        extract_events(conversation_text, self.model.as_ref(), &self.registry)
    }
}

/// Run one extraction against `model`. The model is called exactly once; a
/// caller wanting retries wraps this function in its own policy.
pub fn extract_events(
    conversation_text: &str,
    model: &dyn ModelCollaborator,
    registry: &SchemaRegistry,
) -> Result<ExtractionResult, ExtractionFailure> {
    let extraction_id = Uuid::new_v4();
    let _span = tracing::info_span!("extract_events", %extraction_id).entered();

    if conversation_text.trim().is_empty() {
        return Err(ExtractionFailure {
            extraction_id,
            raw: None,
            error: ExtractionError::EmptyConversation,
        });
    }

    let prompt = build_extraction_prompt(conversation_text);
    tracing::info!(
        conversation_len = conversation_text.len(),
        prompt_len = prompt.len(),
        "Requesting events from model"
    );

    let raw = model.generate(&prompt).map_err(|error| {
        tracing::error!(error = %error, "Model call failed");
        ExtractionFailure {
            extraction_id,
            raw: None,
            error,
        }
    })?;

    process_response(extraction_id, raw, registry)
}

/// Sanitize and validate a raw model response. Also used to re-check saved
/// responses offline.
pub fn process_response(
    extraction_id: Uuid,
    raw: String,
    registry: &SchemaRegistry,
) -> Result<ExtractionResult, ExtractionFailure> {
    let outcome = extract_json_array(&raw).and_then(|span| validate_events(span, registry));

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(
                %extraction_id,
                raw_len = raw.len(),
                error = %error,
                "Model response unusable"
            );
            return Err(ExtractionFailure {
                extraction_id,
                raw: Some(raw),
                error,
            });
        }
    };

    let warnings = batch_warnings(&outcome.accepted);
    tracing::info!(
        %extraction_id,
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        warnings = warnings.len(),
        "Extraction complete"
    );

    Ok(ExtractionResult {
        extraction_id,
        raw,
        accepted: outcome.accepted,
        rejected: outcome.rejected,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::ollama::MockModelClient;
    use crate::pipeline::structuring::types::RejectionReason;

    fn model_response() -> String {
        r#"Here are the events:
```json
[
  {"eventType": "speech", "timestamp": "2024-03-20T14:31:00.000Z", "speakerId": "user_456",
   "content": "Hello, can you help me find the exit?", "confidence": 0.88,
   "language": "en-US", "duration": 2.5},
  {"timestamp": "2024-03-20T14:32:00.000Z", "requestId": "support_789"}
]
```"#
            .to_string()
    }

    #[test]
    fn full_extraction_pipeline() {
        let extractor = EventExtractor::new(Box::new(MockModelClient::new(&model_response())));
        let result = extractor.extract("user_456 asked for the exit").unwrap();

        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].event_type(), "speech");
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].reason, RejectionReason::MissingDiscriminant);
        assert_eq!(result.raw, model_response());
        assert!(!result.is_complete());
        assert_eq!(result.element_count(), 2);
    }

    #[test]
    fn rejects_empty_conversation_without_calling_model() {
        let model = MockModelClient::new("[]");
        let result = extract_events("   \n", &model, &SchemaRegistry::builtin());
        let failure = result.unwrap_err();
        assert!(matches!(failure.error, ExtractionError::EmptyConversation));
        assert!(failure.raw.is_none());
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn model_failure_is_extraction_failure() {
        let model = MockModelClient::failing("connection reset");
        let failure = extract_events("something happened", &model, &SchemaRegistry::builtin())
            .unwrap_err();
        assert!(failure.error.is_model_failure());
        assert!(failure.raw.is_none());
    }

    #[test]
    fn no_array_keeps_raw_text() {
        let model = MockModelClient::new("I'm sorry, I can't find any events.");
        let failure = extract_events("nothing", &model, &SchemaRegistry::builtin()).unwrap_err();
        assert!(matches!(failure.error, ExtractionError::NoJsonArrayFound));
        assert_eq!(failure.raw.as_deref(), Some("I'm sorry, I can't find any events."));
    }

    #[test]
    fn malformed_json_keeps_raw_text() {
        let raw = "[{\"eventType\": \"speech\",]";
        let failure = process_response(Uuid::new_v4(), raw.to_string(), &SchemaRegistry::builtin())
            .unwrap_err();
        assert!(failure.error.is_batch_level());
        assert_eq!(failure.raw.as_deref(), Some(raw));
    }

    #[test]
    fn custom_registry_limits_accepted_types() {
        use crate::pipeline::structuring::schema::{EventSchema, SPEECH_SCHEMA};
        static ONLY_SPEECH: &[EventSchema] = &[SPEECH_SCHEMA];

        let raw = r#"[{"eventType": "detection", "timestamp": "2024-03-20T14:30:00Z"}]"#;
        let extractor = EventExtractor::new(Box::new(MockModelClient::new(raw)))
            .with_registry(SchemaRegistry::new(ONLY_SPEECH).unwrap());
        let result = extractor.extract("person_123 was seen").unwrap();

        assert_eq!(extractor.registry().schemas().len(), 1);
        assert!(matches!(
            result.rejected[0].reason,
            RejectionReason::UnknownEventType { ref event_type } if event_type == "detection"
        ));
    }

    #[test]
    fn empty_array_is_successful_empty_result() {
        let model = MockModelClient::new("[]");
        let result = extract_events("quiet day", &model, &SchemaRegistry::builtin()).unwrap();
        assert!(result.accepted.is_empty());
        assert!(result.is_complete());
    }
}
