use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::Provider;
use crate::errors::PlantError;
use crate::wire::EncodedImage;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions provider. The prompt and the optional
/// image travel in a single user message.
pub struct OpenAIProvider {
    model: String,
    api_key: String,
    client: Client,
    timeout_secs: u64,
    api_base: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: String, timeout_secs: u64, api_base: Option<String>) -> Self {
        Self {
            model,
            api_key,
            client: Client::new(),
            timeout_secs,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }
}

fn build_body(model: &str, prompt: &str, image: Option<&EncodedImage>) -> Value {
    let mut content = vec![json!({ "type": "text", "text": prompt })];
    if let Some(img) = image {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": img.to_data_url() }
        }));
    }
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
    })
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

fn extract_content(text: &str) -> Result<String, PlantError> {
    let parsed: ChatResponse = serde_json::from_str(text)
        .map_err(|e| PlantError::Generation(format!("failed to parse OpenAI response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PlantError::Generation("OpenAI returned an empty completion".into()))
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn generate(&self, prompt: &str, image: Option<&EncodedImage>) -> Result<String, PlantError> {
        let url = format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'));
        let body = build_body(&self.model, prompt, image);
        debug!(%url, model = %self.model, with_image = image.is_some(), "openai: POST");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| PlantError::Generation(format!("OpenAI request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlantError::Generation(format!("OpenAI read body failed: {e}")))?;
        debug!(%status, bytes = text.len(), "openai: response");

        if !status.is_success() {
            return Err(PlantError::Generation(format!("OpenAI API error ({status}): {text}")));
        }
        extract_content(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
