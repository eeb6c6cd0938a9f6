pub mod types;
pub mod schema;
pub mod events;
pub mod prompt;
pub mod sanitize;
pub mod validation;
pub mod ollama;
pub mod orchestrator;
pub mod report;


pub use types::*;
pub use schema::*;
pub use events::*;
pub use prompt::*;
pub use sanitize::*;
pub use validation::*;
pub use ollama::*;
pub use orchestrator::*;
pub use report::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model collaborator failed: {0}")]
    Model(String),

    #[error("Conversation text is empty")]
    EmptyConversation,

    #[error("No JSON array found in model response")]
    NoJsonArrayFound,

    #[error("Malformed JSON in model response: {0}")]
    MalformedJson(String),

    #[error("Model response JSON is not an array (found {0})")]
    NotAnArray(&'static str),

    #[error("Duplicate event type in schema registry: {0}")]
    DuplicateEventType(String),
}

impl ExtractionError {
    /// Batch-level failures: the model answered but nothing usable came back.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            ExtractionError::NoJsonArrayFound
                | ExtractionError::MalformedJson(_)
                | ExtractionError::NotAnArray(_)
        )
    }

    /// Failures reaching or talking to the model backend.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            ExtractionError::OllamaConnection(_)
                | ExtractionError::OllamaError { .. }
                | ExtractionError::HttpClient(_)
                | ExtractionError::ResponseParsing(_)
                | ExtractionError::Model(_)
        )
    }
}
