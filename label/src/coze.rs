//! Labeler backed by a Coze app (open_api v2 chat completions).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::LabelError;
use crate::labeler::Labeler;

pub const COZE_URL: &str = "https://api.coze.com/open_api/v2/chat/completions";

const COZE_USER_ID: &str = "tagloop_label_generator";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CozeConfig {
    pub url: String,
    pub api_key: String,
    pub app_id: String,
    pub timeout_secs: u64,
}

impl Default for CozeConfig {
    fn default() -> Self {
        Self {
            url: COZE_URL.to_string(),
            api_key: String::new(),
            app_id: String::new(),
            timeout_secs: 30,
        }
    }
}

pub struct CozeLabeler {
    client: Client,
    cfg: CozeConfig,
}

impl CozeLabeler {
    pub fn new(cfg: CozeConfig) -> Result<Self, LabelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .map_err(|e| LabelError::Api(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "app_id": self.cfg.app_id,
            "user_id": COZE_USER_ID,
            "stream": false,
            "messages": [{ "role": "user", "content": text }],
        })
    }
}

#[derive(Deserialize)]
struct CozeResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    choices: Vec<CozeChoice>,
}

#[derive(Deserialize)]
struct CozeChoice {
    message: CozeMessage,
}

#[derive(Deserialize)]
struct CozeMessage {
    content: String,
}

fn extract(resp: CozeResponse) -> Result<String, LabelError> {
    if resp.code != 0 {
        return Err(LabelError::Api(format!("code {}: {}", resp.code, resp.msg)));
    }
    resp.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LabelError::Malformed("no choices".into()))
}

#[async_trait::async_trait]
impl Labeler for CozeLabeler {
    async fn try_generate(&self, text: &str) -> Result<String, LabelError> {
        if text.is_empty() {
            return Err(LabelError::EmptyInput);
        }
        if self.cfg.api_key.is_empty() {
            return Err(LabelError::MissingCredentials("api_key"));
        }
        if self.cfg.app_id.is_empty() {
            return Err(LabelError::MissingCredentials("app_id"));
        }

        let resp = self
            .client
            .post(&self.cfg.url)
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

        let data: CozeResponse = resp
            .json()
            .await
            .map_err(|e| LabelError::Malformed(e.to_string()))?;
        extract(data)
    }

    fn name(&self) -> &str {
        "coze"
    }
}
