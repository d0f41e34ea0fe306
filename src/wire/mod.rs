use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::PlantError;

/// ========================================
/// Gallery and conversation data
/// ========================================

/// One identified plant, persisted as part of the gallery.
///
/// Field names are camelCase on disk so an exported browser gallery
/// (`savedPlants`) loads unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub name: String,
    pub scientific_name: String,
    pub description: String,
    pub care: Vec<String>,
    /// `data:<mime>;base64,<payload>`
    pub image: String,
}

impl PlantRecord {
    pub fn encoded_image(&self) -> Result<EncodedImage, PlantError> {
        EncodedImage::from_data_url(&self.image)
    }
}

/// An image ready to be sent inline to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Base64 payload, without the data URL prefix.
    pub data: String,
}

fn data_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=\s]*)$")
            .expect("data url pattern is valid")
    })
}

impl EncodedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    pub fn from_data_url(url: &str) -> Result<Self, PlantError> {
        let caps = data_url_re()
            .captures(url.trim())
            .ok_or_else(|| PlantError::Encoding("not a base64 data url".into()))?;
        Ok(Self {
            mime_type: caps[1].to_string(),
            data: caps[2].chars().filter(|c| !c.is_whitespace()).collect(),
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, PlantError> {
        BASE64_STANDARD
            .decode(&self.data)
            .map_err(|e| PlantError::Encoding(format!("invalid base64 payload: {e}")))
    }

    /// Size of the decoded payload, without decoding it.
    pub fn byte_len(&self) -> usize {
        let pad = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(pad)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::User }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Bot }
    }
}
