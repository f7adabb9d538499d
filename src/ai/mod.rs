//! Chat-completion client for the AI helper routes.
//!
//! Speaks the OpenRouter `/chat/completions` dialect. The base URL is
//! configurable so tests can point it at a local mock server.

pub mod prompts;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};

pub use prompts::Prompt;

const SERVICE: &str = "openrouter";
const APP_REFERER: &str = "https://billsense.ai";
const APP_TITLE: &str = "BillSense AI";

// ============================================================================
// OPENROUTER API STRUCTS (Internal)
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Text returned by the model plus token accounting
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn complete(&self, prompt: &Prompt) -> AppResult<Completion> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!("OPENROUTER_API_KEY not configured");
            AppError::AiNotConfigured
        })?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };

        debug!(model = %self.model, "📤 Calling chat completion API");

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                AppError::upstream(SERVICE, format!("{}: {}", reason, e))
            })?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            return Err(AppError::upstream(SERVICE, describe_status(status, &error_text)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("unreadable response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AppError::upstream(SERVICE, "empty completion"));
        }

        let usage = parsed.usage.unwrap_or_default();
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "✅ Completion received"
        );

        Ok(Completion { content, usage })
    }

    /// Completion whose body must be a JSON document of type `T`.
    pub async fn complete_json<T: DeserializeOwned>(&self, prompt: &Prompt) -> AppResult<T> {
        let completion = self.complete(prompt).await?;
        parse_json_reply(&completion.content)
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    let summary = match status.as_u16() {
        401 | 403 => "API key rejected",
        429 => "rate limited",
        500..=599 => "service unavailable",
        _ => "unexpected status",
    };
    format!("{} ({}): {}", summary, status, body)
}

/// Removes a surrounding markdown code fence such as ```` ```json ... ``` ````.
pub fn strip_code_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Slice from the first `{`/`[` to the last `}`/`]`, for replies that wrap
/// the JSON in prose.
fn embedded_json(content: &str) -> Option<&str> {
    let start = content.find(['{', '['])?;
    let end = content.rfind(['}', ']'])?;
    (end > start).then(|| &content[start..=end])
}

pub fn parse_json_reply<T: DeserializeOwned>(content: &str) -> AppResult<T> {
    let clean = strip_code_fences(content);
    let parsed = serde_json::from_str(clean).or_else(|e| match embedded_json(clean) {
        Some(inner) if inner != clean => serde_json::from_str(inner),
        _ => Err(e),
    });
    parsed.map_err(|e| {
        error!(error = %e, content = %clean, "Failed to parse AI JSON response");
        AppError::upstream(SERVICE, format!("response was not the expected JSON: {}", e))
    })
}
