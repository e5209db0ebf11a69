//! Labeler backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::LabelError;
use crate::labeler::Labeler;

pub const DEFAULT_PROMPT: &str = "You label customer feedback. Reply with exactly one tag \
in the form product-issue-detail (three short parts joined by '-', no spaces, no extra text).";

/// Chat labeler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// System prompt describing the label format.
    pub prompt: String,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            timeout_secs: 30,
        }
    }
}

pub struct ChatLabeler {
    client: Client,
    cfg: ChatConfig,
}

impl ChatLabeler {
    pub fn new(cfg: ChatConfig) -> Result<Self, LabelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .map_err(|e| LabelError::Api(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.cfg.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": self.cfg.prompt },
                { "role": "user", "content": text },
            ],
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_content(resp: ChatResponse) -> Result<String, LabelError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LabelError::Malformed("no choices[0].message.content".into()))
}

#[async_trait::async_trait]
impl Labeler for ChatLabeler {
    async fn try_generate(&self, text: &str) -> Result<String, LabelError> {
        if text.is_empty() {
            return Err(LabelError::EmptyInput);
        }
        if self.cfg.api_key.is_empty() {
            return Err(LabelError::MissingCredentials("api_key"));
        }

        let url = format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.cfg.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LabelError::Timeout(self.cfg.timeout_secs)
                } else {
                    LabelError::Api(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LabelError::Api(format!("HTTP {status}: {body}")));
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LabelError::Malformed(e.to_string()))?;
        first_content(data)
    }

    fn name(&self) -> &str {
        "chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":" app-pay-failed "}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), " app-pay-failed ");
    }

    #[test]
    fn empty_choices_is_malformed() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(resp), Err(LabelError::Malformed(_))));
    }

    #[test]
    fn request_body_carries_prompt_and_text() {
        let l = ChatLabeler::new(ChatConfig::default()).unwrap();
        let body = l.request_body("refund takes forever");
        assert_eq!(body["messages"][0]["content"], DEFAULT_PROMPT);
        assert_eq!(body["messages"][1]["content"], "refund takes forever");
    }

    #[tokio::test]
    async fn missing_api_key() {
        let l = ChatLabeler::new(ChatConfig::default()).unwrap();
        let err = l.try_generate("x").await.unwrap_err();
        assert!(matches!(err, LabelError::MissingCredentials("api_key")));
    }
}
