//! The three-variant `Provider` enum: OpenAI, Claude, Gemini.
//!
//! Each variant owns its own request/response DTOs and builds a
//! provider-shaped payload from the same (images, user_prompt, system_prompt)
//! triple. No trait object — the call site matches on the enum directly.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::image::ImagePayload;

const CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Claude,
    Gemini,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    /// Default model-name fallback cascade, tried in order until one
    /// succeeds. Mirrors the teacher's `GeminiClient::analyze_transcript`
    /// multi-model retry, generalized to every provider.
    pub fn model_fallbacks(self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4o", "gpt-4o-mini"],
            Provider::Claude => &["claude-sonnet-4-20250514", "claude-3-7-sonnet-20250219"],
            Provider::Gemini => &["gemini-2.5-flash", "gemini-2.5-pro", "gemini-2.0-flash"],
        }
    }

    pub fn validate_config(self) -> ProviderResult<()> {
        let var = self.api_key_env();
        match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(ProviderError::Config(format!("{var} not set"))),
        }
    }

    fn api_key_env(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    fn api_key(self) -> ProviderResult<String> {
        std::env::var(self.api_key_env())
            .map_err(|_| ProviderError::Config(format!("{} not set", self.api_key_env())))
    }

    /// Run the request, trying `AI_MODEL_NAME` (if set) first, then each
    /// model in `model_fallbacks` in turn. Returns the model name that
    /// produced the response alongside the raw text, so callers can
    /// record which one actually answered.
    pub async fn call(
        self,
        client: &Client,
        images: &[ImagePayload],
        user_prompt: &str,
        system_prompt: &str,
    ) -> ProviderResult<(String, String)> {
        let api_key = self.api_key()?;
        let mut last_err = None;

        let override_model = std::env::var("AI_MODEL_NAME").ok();
        let models: Vec<&str> = override_model
            .iter()
            .map(String::as_str)
            .chain(self.model_fallbacks().iter().copied())
            .collect();

        for model in models {
            info!(provider = self.name(), model, "calling provider");
            let attempt = match self {
                Provider::OpenAi => call_openai(client, &api_key, model, images, user_prompt, system_prompt).await,
                Provider::Claude => call_claude(client, &api_key, model, images, user_prompt, system_prompt).await,
                Provider::Gemini => call_gemini(client, &api_key, model, images, user_prompt, system_prompt).await,
            };
            match attempt {
                Ok(text) => return Ok((model.to_string(), text)),
                Err(e) => {
                    warn!(provider = self.name(), model, error = %e, "model attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(ProviderError::EmptyResponse { provider: self.name() }))
    }
}

fn strip_markdown_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")).unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

// ---- OpenAI (chat completions shape) ----

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

async fn call_openai(
    client: &Client,
    api_key: &str,
    model: &str,
    images: &[ImagePayload],
    user_prompt: &str,
    system_prompt: &str,
) -> ProviderResult<String> {
    let mut content = vec![serde_json::json!({"type": "text", "text": user_prompt})];
    content.extend(images.iter().map(ImagePayload::to_openai_json));

    let request = OpenAiRequest {
        model,
        messages: vec![
            OpenAiMessage {
                role: "system",
                content: serde_json::Value::String(system_prompt.to_string()),
            },
            OpenAiMessage {
                role: "user",
                content: serde_json::Value::Array(content),
            },
        ],
        max_tokens: 2000,
        temperature: 0.7,
    };

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(api_key)
        .timeout(CALL_TIMEOUT)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::Request { provider: "openai", message: e.to_string() })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::BadStatus { provider: "openai", status, body });
    }

    let parsed: OpenAiResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Decode { provider: "openai", message: e.to_string() })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .ok_or(ProviderError::EmptyResponse { provider: "openai" })
}

// ---- Claude (messages + system shape) ----

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ClaudeMessage>,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
}

#[derive(Deserialize)]
struct ClaudeContentBlock {
    #[serde(default)]
    text: String,
}

async fn call_claude(
    client: &Client,
    api_key: &str,
    model: &str,
    images: &[ImagePayload],
    user_prompt: &str,
    system_prompt: &str,
) -> ProviderResult<String> {
    let mut content = vec![serde_json::json!({"type": "text", "text": user_prompt})];
    content.extend(images.iter().map(ImagePayload::to_claude_json));

    let request = ClaudeRequest {
        model,
        max_tokens: 4096,
        system: system_prompt,
        messages: vec![ClaudeMessage { role: "user", content }],
    };

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .timeout(CALL_TIMEOUT)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::Request { provider: "claude", message: e.to_string() })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::BadStatus { provider: "claude", status, body });
    }

    let parsed: ClaudeResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Decode { provider: "claude", message: e.to_string() })?;

    parsed
        .content
        .into_iter()
        .next()
        .map(|b| b.text)
        .filter(|t| !t.is_empty())
        .ok_or(ProviderError::EmptyResponse { provider: "claude" })
}

// ---- Gemini (contents[].parts[] shape) ----

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

async fn call_gemini(
    client: &Client,
    api_key: &str,
    model: &str,
    images: &[ImagePayload],
    user_prompt: &str,
    system_prompt: &str,
) -> ProviderResult<String> {
    let mut parts = vec![serde_json::json!({"text": format!("{system_prompt}\n\n{user_prompt}")})];
    parts.extend(images.iter().map(ImagePayload::to_gemini_json));

    let request = GeminiRequest {
        contents: vec![GeminiContent { role: "user", parts }],
    };

    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}"
    );

    let response = client
        .post(&url)
        .timeout(CALL_TIMEOUT)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::Request { provider: "gemini", message: e.to_string() })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::BadStatus { provider: "gemini", status, body });
    }

    let parsed: GeminiResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Decode { provider: "gemini", message: e.to_string() })?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or(ProviderError::EmptyResponse { provider: "gemini" })?;

    Ok(strip_markdown_fence(&text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let fenced = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_markdown_fence(fenced), "{\"a\":1}");
    }

    #[test]
    fn provider_names_are_stable() {
        assert_eq!(Provider::OpenAi.name(), "openai");
        assert_eq!(Provider::Claude.name(), "claude");
        assert_eq!(Provider::Gemini.name(), "gemini");
    }
}
