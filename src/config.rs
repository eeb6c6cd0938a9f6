/// Application-level constants
pub const APP_NAME: &str = "event-extract";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local Ollama instance
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Small instruct model, same class as the one the prompt was written for.
pub const DEFAULT_MODEL: &str = "llama3.2:1b";

/// Generation can take minutes on CPU-only machines.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Generation cap passed to the backend as `num_predict`.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    format!("{}=info,warn", env!("CARGO_CRATE_NAME"))
}

/// Settings for the model backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_new_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        }
    }
}
