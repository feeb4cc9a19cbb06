//! Pet-care advice through an OpenAI-compatible chat-completion API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Fixed persona for the assistant.
pub const SYSTEM_PROMPT: &str = "Ты помощник-ветеринар по имени Степан. Ты даешь общие, \
осторожные рекомендации по уходу за домашними животными. Ты НЕ ставишь диагнозы и всегда \
напоминаешь обратиться к живому ветеринарному врачу при любых серьёзных симптомах.";

/// Appended to every answer.
pub const DISCLAIMER: &str = "Важно: этот ответ носит рекомендательный характер и не заменяет \
очный приём у ветеринарного врача. При любых сомнениях обратитесь в клинику.";

/// Used when the provider returns no content.
pub const FALLBACK_ANSWER: &str = "Извините, сейчас не могу ответить. Попробуйте ещё раз позже.";

/// Sampling temperature.
pub const TEMPERATURE: f32 = 0.4;

/// Answer length cap.
pub const MAX_TOKENS: u32 = 600;

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Error type for advice provider operations.
#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status.
    #[error("advice provider error: {status}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
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

/// Chat-completion client.
#[derive(Debug, Clone)]
pub struct AdviceClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AdviceClient {
    /// Create a new advice client.
    ///
    /// * `base_url` - API base, e.g. `"https://api.openai.com/v1"`
    /// * `api_key` - bearer token
    /// * `model` - model name
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AdviceError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Ask one question and return the answer with the disclaimer appended.
    pub async fn ask(&self, question: &str) -> Result<String, AdviceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Advice provider returned an error");
            return Err(AdviceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        Ok(format!("{answer}\n\n{DISCLAIMER}"))
    }
}
