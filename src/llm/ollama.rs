use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

use super::{GenerationOutcome, GenerationRequest, LlmClient, LlmError};

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    generation_timeout_secs: u64,
    pull_timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: &str,
        generation_timeout_secs: u64,
        pull_timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(generation_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            generation_timeout_secs,
            pull_timeout_secs,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.ollama_base_url,
            &settings.ollama_model,
            settings.generation_timeout_secs,
            settings.pull_timeout_secs,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pull the configured model onto the inference server. One bounded
    /// attempt; callers never retry beyond this.
    async fn pull_model(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/pull", self.base_url);
        tracing::info!(model = %self.model, "Model not loaded, attempting one pull");

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.pull_timeout_secs))
            .json(&OllamaPullRequest {
                name: &self.model,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, self.pull_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Availability gate run before every generation: checks the model is
    /// loaded, pulling it once if absent.
    async fn ensure_model(&self) -> Result<(), String> {
        if self.is_model_available().await {
            return Ok(());
        }
        self.pull_model()
            .await
            .map_err(|e| format!("model {} unavailable: {e}", self.model))
    }

    fn map_transport_error(&self, e: reqwest::Error, timeout_secs: u64) -> LlmError {
        if e.is_connect() {
            LlmError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout(timeout_secs)
        } else {
            LlmError::ResponseParsing(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Request body for Ollama /api/pull
#[derive(Serialize)]
struct OllamaPullRequest<'a> {
    name: &'a str,
    stream: bool,
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

#[async_trait]
impl LlmClient for OllamaClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        let start = Instant::now();

        if let Err(reason) = self.ensure_model().await {
            return GenerationOutcome::Failure {
                reason,
                latency_ms: start.elapsed().as_millis() as i64,
            };
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature.clamp(0.0, 1.0),
                num_predict: request.max_tokens,
            },
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = self.map_transport_error(e, self.generation_timeout_secs);
                return GenerationOutcome::Failure {
                    reason: error.to_string(),
                    latency_ms: start.elapsed().as_millis() as i64,
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return GenerationOutcome::Failure {
                reason: LlmError::Http {
                    status: status.as_u16(),
                    body,
                }
                .to_string(),
                latency_ms: start.elapsed().as_millis() as i64,
            };
        }

        match response.json::<OllamaGenerateResponse>().await {
            Ok(parsed) => GenerationOutcome::Success {
                text: parsed.response,
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as i64,
            },
            Err(e) => GenerationOutcome::Failure {
                reason: LlmError::ResponseParsing(e.to_string()).to_string(),
                latency_ms: start.elapsed().as_millis() as i64,
            },
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, self.generation_timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

// ═══════════════════════════════════════════════════════════
// MockLlmClient — scripted outcomes for tests
// ═══════════════════════════════════════════════════════════

/// Mock LLM client. Pops scripted responses in order, repeating the last
/// one when the script runs out.
pub struct MockLlmClient {
    model: String,
    script: std::sync::Mutex<Vec<Result<String, String>>>,
    available_models: Vec<String>,
}

impl MockLlmClient {
    /// Always answers with the given text.
    pub fn succeeding(response: &str) -> Self {
        Self::with_script(vec![Ok(response.to_string())])
    }

    /// Always fails with the given reason.
    pub fn failing(reason: &str) -> Self {
        Self::with_script(vec![Err(reason.to_string())])
    }

    /// Answers with each scripted outcome in order; the last repeats.
    pub fn with_script(script: Vec<Result<String, String>>) -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            script: std::sync::Mutex::new(script),
            available_models: vec!["llama3.1:8b".to_string()],
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, _request: GenerationRequest) -> GenerationOutcome {
        let mut script = self.script.lock().expect("mock script lock");
        let next = if script.len() > 1 {
            script.remove(0)
        } else {
            script.first().cloned().unwrap_or(Err("empty script".into()))
        };

        match next {
            Ok(text) => GenerationOutcome::Success {
                text,
                model: self.model.clone(),
                latency_ms: 1,
            },
            Err(reason) => GenerationOutcome::Failure {
                reason,
                latency_ms: 1,
            },
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.1:8b", 30, 300);
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model_id(), "llama3.1:8b");
    }

    #[test]
    fn from_settings_uses_configured_timeouts() {
        let settings = Settings::default();
        let client = OllamaClient::from_settings(&settings);
        assert_eq!(client.generation_timeout_secs, 30);
        assert_eq!(client.pull_timeout_secs, 300);
    }

    #[tokio::test]
    async fn mock_returns_configured_response() {
        let mock = MockLlmClient::succeeding("test response");
        let outcome = mock.generate(GenerationRequest::new("prompt")).await;
        match outcome {
            GenerationOutcome::Success { text, .. } => assert_eq!(text, "test response"),
            GenerationOutcome::Failure { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn mock_script_plays_in_order_then_repeats() {
        let mock = MockLlmClient::with_script(vec![
            Ok("first".into()),
            Err("down".into()),
        ]);

        assert!(mock.generate(GenerationRequest::new("a")).await.is_success());
        assert!(!mock.generate(GenerationRequest::new("b")).await.is_success());
        // Last entry repeats
        assert!(!mock.generate(GenerationRequest::new("c")).await.is_success());
    }

    #[tokio::test]
    async fn mock_model_availability() {
        let mock = MockLlmClient::succeeding("ok");
        assert!(mock.is_model_available().await);

        let other = MockLlmClient::succeeding("ok").with_models(vec!["mistral:7b".into()]);
        assert!(!other.is_model_available().await);
    }
}
