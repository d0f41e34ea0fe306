//! Test doubles for [`Provider`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

use super::Provider;
use crate::errors::PlantError;
use crate::wire::EncodedImage;

#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub image: Option<EncodedImage>,
}

/// Replays queued results in order and records every call. An exhausted
/// script fails the call.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, PlantError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = Result<String, PlantError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, prompt: &str, image: Option<&EncodedImage>) -> Result<String, PlantError> {
        self.calls.lock().push(Call { prompt: prompt.to_string(), image: image.cloned() });
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PlantError::Generation("script exhausted".into())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Blocks every call until [`GatedProvider::open`] is called, then answers
/// with `reply`.
pub struct GatedProvider {
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    reply: String,
}

impl GatedProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { gate: Arc::new(Notify::new()), entered: Arc::new(Notify::new()), reply: reply.into() }
    }

    /// Resolves once a call is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Provider for GatedProvider {
    async fn generate(&self, _prompt: &str, _image: Option<&EncodedImage>) -> Result<String, PlantError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "gated"
    }
}
