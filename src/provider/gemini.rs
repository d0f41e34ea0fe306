use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Provider;
use crate::errors::PlantError;
use crate::wire::EncodedImage;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Talks to the Gemini `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
    api_base: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, timeout_secs: u64, api_base: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base.trim_end_matches('/'), self.model)
    }

    /// The key travels in a header so it never appears in a URL, and so
    /// never in a transport error message.
    fn request(&self, body: &GenerateContentRequest) -> RequestBuilder {
        self.client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .json(body)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn build_request(prompt: &str, image: Option<&EncodedImage>) -> GenerateContentRequest {
    let mut parts = vec![Part::Text { text: prompt.to_string() }];
    if let Some(img) = image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: img.mime_type.clone(),
                data: img.data.clone(),
            },
        });
    }
    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
    }
}

fn extract_text(body: &str) -> Result<String, PlantError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| PlantError::Generation(format!("failed to parse Gemini response: {e}")))?;

    let text: String = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(PlantError::Generation("Gemini returned no text in the response candidates".into()));
    }
    Ok(text)
}

fn describe_http_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .map(|w| match (w.error.status, w.error.message) {
            (Some(s), Some(m)) => format!("{s}: {m}"),
            (None, Some(m)) => m,
            (Some(s), None) => s,
            (None, None) => body.to_string(),
        })
        .unwrap_or_else(|| body.to_string());
    format!("Gemini API error ({status}): {detail}")
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, prompt: &str, image: Option<&EncodedImage>) -> Result<String, PlantError> {
        let body = build_request(prompt, image);
        debug!(url = %self.endpoint(), model = %self.model, with_image = image.is_some(), "gemini: POST");

        let resp = self
            .request(&body)
            .send()
            .await
            .map_err(|e| PlantError::Generation(format!("Gemini request failed: {}", e.without_url())))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlantError::Generation(format!("Gemini read body failed: {}", e.without_url())))?;
        debug!(%status, bytes = text.len(), "gemini: response");

        if !status.is_success() {
            return Err(PlantError::Generation(describe_http_error(status, &text)));
        }
        extract_text(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
