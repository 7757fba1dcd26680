//! OpenAI-compatible chat completions generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::generator::{GenerateError, GenerationParams, Generator};

/// Generator backed by `POST {base_url}/chat/completions`.
///
/// The API key is an explicit constructor argument; nothing here reads the
/// process environment.
pub struct OpenAiGenerator {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiGenerator {
    /// Build a client for `config`, authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (e.g. TLS backend
    /// initialisation).
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self, GenerateError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    /// The model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        let req = ChatRequest::new(&self.model, prompt, params);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, retry_after, body));
        }

        let res: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Decode(e.to_string()))?;
        res.into_completion()
    }
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn status_error(status: StatusCode, retry_after: Option<Duration>, body: String) -> GenerateError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(?retry_after, "generator rate limited");
        GenerateError::RateLimited { retry_after }
    } else {
        GenerateError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &'a GenerationParams) -> Self {
        Self {
            model,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stop: &params.stop,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_completion(self) -> Result<String, GenerateError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerateError::EmptyCompletion)
    }
}
