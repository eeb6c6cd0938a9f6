use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::ModelCollaborator;
use super::ExtractionError;
use crate::config::ModelSettings;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    max_new_tokens: u32,
}

impl OllamaClient {
    pub fn new(settings: &ModelSettings) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            client,
            timeout_secs: settings.timeout_secs,
            max_new_tokens: settings.max_new_tokens,
        })
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local() -> Result<Self, ExtractionError> {
        Self::new(&ModelSettings::default())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn list_models(&self) -> Result<Vec<String>, ExtractionError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_connect() {
            ExtractionError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            ExtractionError::HttpClient(format!(
                "Request timed out after {}s",
                self.timeout_secs
            ))
        } else {
            ExtractionError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl ModelCollaborator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_new_tokens,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling Ollama generate");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Mock model for testing — returns a configurable response and counts calls.
pub struct MockModelClient {
    response: Result<String, String>,
    calls: AtomicUsize,
}

impl MockModelClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A backend that always errors with `ExtractionError::Model`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelCollaborator for MockModelClient {
    fn generate(&self, _prompt: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(ExtractionError::Model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockModelClient::new("test response");
        assert_eq!(client.generate("prompt").unwrap(), "test response");
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn failing_mock_returns_model_error() {
        let client = MockModelClient::failing("backend down");
        let err = client.generate("prompt").unwrap_err();
        assert!(matches!(err, ExtractionError::Model(ref m) if m == "backend down"));
        assert!(err.is_model_failure());
    }

    #[test]
    fn ollama_client_constructor() {
        let settings = ModelSettings {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2:1b".into(),
            timeout_secs: 120,
            max_new_tokens: 256,
        };
        let client = OllamaClient::new(&settings).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
        assert_eq!(client.max_new_tokens, 256);
        assert_eq!(client.model(), "llama3.2:1b");
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let settings = ModelSettings {
            base_url: "http://localhost:11434/".into(),
            ..ModelSettings::default()
        };
        let client = OllamaClient::new(&settings).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn default_local_uses_standard_port() {
        let client = OllamaClient::default_local().unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn generate_request_carries_generation_cap() {
        let body = OllamaGenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: OllamaOptions { num_predict: 512 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["options"]["num_predict"], 512);
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        // Port 9 (discard) is closed on test machines.
        let settings = ModelSettings {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 5,
            ..ModelSettings::default()
        };
        let client = OllamaClient::new(&settings).unwrap();
        let err = client.generate("hello").unwrap_err();
        assert!(matches!(err, ExtractionError::OllamaConnection(ref url) if url == "http://127.0.0.1:9"));
        assert!(err.is_model_failure());
    }

    /// Serve one canned HTTP response on a local port and return the base URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{addr}")
    }

    /// Drain headers and body so closing the socket does not reset the connection.
    fn read_request(stream: &mut TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            data.extend_from_slice(&buf[..n]);
            let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&data[..end]);
            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                return;
            }
        }
    }

    fn client_for(base_url: String) -> OllamaClient {
        OllamaClient::new(&ModelSettings {
            base_url,
            timeout_secs: 10,
            ..ModelSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn generate_returns_response_field() {
        let url = serve_once("200 OK", r#"{"model":"llama3.2:1b","response":"[]","done":true}"#);
        assert_eq!(client_for(url).generate("hello").unwrap(), "[]");
    }

    #[test]
    fn server_error_status_maps_to_ollama_error() {
        let url = serve_once("500 Internal Server Error", r#"{"error":"model not loaded"}"#);
        let err = client_for(url).generate("hello").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::OllamaError { status: 500, ref body } if body.contains("model not loaded")
        ));
    }

    #[test]
    fn undecodable_body_maps_to_response_parsing() {
        let url = serve_once("200 OK", "this is not json");
        let err = client_for(url).generate("hello").unwrap_err();
        assert!(matches!(err, ExtractionError::ResponseParsing(_)));
    }

    #[test]
    fn list_models_reads_tag_names() {
        let url = serve_once(
            "200 OK",
            r#"{"models":[{"name":"llama3.2:1b","size":1},{"name":"mistral:7b","size":2}]}"#,
        );
        let models = client_for(url).list_models().unwrap();
        assert_eq!(models, vec!["llama3.2:1b", "mistral:7b"]);
    }

    #[test]
    fn list_models_not_found_maps_to_ollama_error() {
        let url = serve_once("404 Not Found", "404 page not found");
        let err = client_for(url).list_models().unwrap_err();
        assert!(matches!(err, ExtractionError::OllamaError { status: 404, .. }));
    }
}
