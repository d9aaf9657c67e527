mod fake;

pub use fake::FakeModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("LLM response unusable: {0}")]
    Parse(String),

    #[error("LLM not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One unit of a message: text, or an attached file as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text {
        text: String,
    },
    File {
        data: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// A hosted text-generation model.
#[async_trait]
pub trait GenerativeModel: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// Whatever the provider reports; callers get it unchanged.
    async fn generate_text(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError>;

    fn provider_name(&self) -> &'static str;
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    pub base: String,
    pub token: String,
    http: reqwest::Client,
}

impl LlmClient {
    #[must_use]
    pub fn new(base: String, token: String) -> Self {
        Self {
            base,
            token,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base.trim_end_matches('/'))
    }
}

fn part_to_json(part: &ContentPart) -> JsonValue {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::File { data, media_type } if media_type.starts_with("image/") => json!({
            "type": "image_url",
            "image_url": { "url": format!("data:{media_type};base64,{data}") }
        }),
        ContentPart::File { data, media_type } => json!({
            "type": "file",
            "file": { "file_data": format!("data:{media_type};base64,{data}") }
        }),
    }
}

/// Chat-completions body: system instruction first, then the user turns.
#[must_use]
pub fn chat_body(req: &GenerateRequest) -> JsonValue {
    let mut messages = vec![json!({ "role": "system", "content": req.system })];
    messages.extend(req.messages.iter().map(|m| {
        json!({
            "role": m.role,
            "content": m.content.iter().map(part_to_json).collect::<Vec<_>>(),
        })
    }));
    json!({ "model": req.model, "messages": messages })
}

fn extract_text(envelope: &JsonValue) -> Result<String, LlmError> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(JsonValue::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| LlmError::Parse("response missing choices[0].message.content".into()))
}

#[async_trait]
impl GenerativeModel for LlmClient {
    async fn generate_text(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        if self.token.trim().is_empty() {
            return Err(LlmError::NotConfigured("LLM API key is not set".into()));
        }

        tracing::debug!(model = %req.model, parts = req.messages.iter().map(|m| m.content.len()).sum::<usize>(), "sending chat completion");

        let resp = self
            .http
            .post(self.endpoint())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.token)
            .json(&chat_body(req))
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let envelope: JsonValue =
            serde_json::from_str(&text).map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(GenerateResponse {
            text: extract_text(&envelope)?,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}
