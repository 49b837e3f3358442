//! LLM integration: the client contract and its Ollama implementation.
//!
//! Generation never raises to the caller. Transport, timeout, and model
//! errors are folded into `GenerationOutcome::Failure`; every call site has
//! a deterministic fallback and decides locally what to do with a failure.

pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from inference-server housekeeping calls (model listing).
/// Generation itself reports through `GenerationOutcome`, not this type.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Cannot reach inference server at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Inference server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed inference response: {0}")]
    ResponseParsing(String),
}

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Sampling temperature, clamped to [0, 1].
    pub temperature: f32,
    /// Optional cap on generated tokens (`num_predict`).
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Uniform result shape for generation calls.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Success {
        text: String,
        model: String,
        latency_ms: i64,
    },
    Failure {
        reason: String,
        latency_ms: i64,
    },
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn latency_ms(&self) -> i64 {
        match self {
            Self::Success { latency_ms, .. } | Self::Failure { latency_ms, .. } => *latency_ms,
        }
    }
}

/// Client contract for the local inference server.
///
/// Injected as `Arc<dyn LlmClient>` everywhere (no global singleton), so
/// tests substitute `MockLlmClient`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// The model identifier generation requests are issued against.
    fn model_id(&self) -> &str;

    /// Run one generation request. Never errors; see `GenerationOutcome`.
    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome;

    /// List model identifiers available on the inference server.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Whether the configured model is loaded on the server.
    async fn is_model_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                let wanted = self.model_id();
                models.iter().any(|m| m == wanted || m.starts_with(wanted))
            }
            Err(_) => false,
        }
    }
}

/// Extract the first balanced `{...}` object from free text.
///
/// Models wrap their JSON in prose, code fences, or trailing commentary;
/// the decodable substring is the span from the first `{` to its matching
/// brace. Braces inside JSON strings are skipped.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
