//! Deterministic model for tests and offline runs.

use super::{GenerateRequest, GenerateResponse, GenerativeModel, LlmError};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
enum Reply {
    Text(String),
    Fail(String),
}

/// Answers every request the same way and remembers what it was sent.
#[derive(Debug)]
pub struct FakeModel {
    reply: Reply,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl FakeModel {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::Text(text.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(message.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate_text(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());
        match &self.reply {
            Reply::Text(text) => Ok(GenerateResponse { text: text.clone() }),
            Reply::Fail(msg) => Err(LlmError::Request(msg.clone())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
