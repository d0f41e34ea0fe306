use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::flight::Flight;
use crate::log::ExchangeLog;
use crate::prompt::{build_chat_prompt, NO_PLANTS_REPLY};
use crate::provider::DynProvider;
use crate::store::PlantStore;
use crate::wire::ChatMessage;

pub const FALLBACK_REPLY: &str = "I apologize, but I'm having trouble processing your request. Please try again.";

pub fn greeting(plant_count: usize) -> &'static str {
    if plant_count > 0 {
        "Ask me anything about the plants in your gallery!"
    } else {
        "Add some plants to your gallery first!"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied(ChatMessage),
    Rejected(Rejection),
}

/// One chat panel. The conversation lives and dies with this value.
pub struct ChatSession {
    store: Arc<PlantStore>,
    provider: DynProvider,
    exchange_log: Option<ExchangeLog>,
    messages: Mutex<Vec<ChatMessage>>,
    flight: Flight,
}

impl ChatSession {
    pub fn new(store: Arc<PlantStore>, provider: DynProvider) -> Self {
        Self {
            store,
            provider,
            exchange_log: None,
            messages: Mutex::new(Vec::new()),
            flight: Flight::default(),
        }
    }

    pub fn with_exchange_log(mut self, log: Option<ExchangeLog>) -> Self {
        self.exchange_log = log;
        self
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.flight.is_active()
    }

    pub async fn submit(&self, input: &str) -> ChatOutcome {
        if input.trim().is_empty() {
            return ChatOutcome::Rejected(Rejection::Empty);
        }
        let Some(_guard) = self.flight.try_begin() else {
            debug!("chat submission rejected; previous one still in flight");
            return ChatOutcome::Rejected(Rejection::Busy);
        };

        self.messages.lock().push(ChatMessage::user(input));

        let plants = self.store.load();
        let text = if plants.is_empty() {
            NO_PLANTS_REPLY.to_string()
        } else {
            let prompt = build_chat_prompt(&plants, input);
            let outcome = self.provider.generate(&prompt, None).await;
            if let Some(log) = &self.exchange_log {
                log.record_outcome("chat", self.provider.model(), &prompt, None, &outcome);
            }
            outcome.unwrap_or_else(|e| {
                warn!(error = %e, "chat generation failed");
                FALLBACK_REPLY.to_string()
            })
        };

        let reply = ChatMessage::bot(text);
        self.messages.lock().push(reply.clone());
        ChatOutcome::Replied(reply)
    }
}
