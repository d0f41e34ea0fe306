use async_trait::async_trait;
use std::sync::Arc;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::PlantError;
use crate::wire::EncodedImage;

pub mod gemini;
pub mod openai;

#[cfg(test)]
pub mod fake;

/// The external generative-AI capability.
///
/// Any transport, quota, model or decoding failure comes back as
/// [`PlantError::Generation`].
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str, image: Option<&EncodedImage>) -> Result<String, PlantError>;

    fn model(&self) -> &str;
}

pub type DynProvider = Arc<dyn Provider>;

/// Builds the configured provider, once for identification and once for
/// chat (the two may use different models). Fails before any request if the
/// credential is missing.
pub fn make_provider(cfg: &Config, model: &str) -> Result<DynProvider, PlantError> {
    let api_key = cfg.api_key()?;
    match cfg.provider {
        ProviderKind::Gemini => Ok(Arc::new(gemini::GeminiProvider::new(
            api_key,
            model.to_string(),
            cfg.timeout_secs,
            cfg.api_base.clone(),
        ))),
        ProviderKind::OpenAI => Ok(Arc::new(openai::OpenAIProvider::new(
            api_key,
            model.to_string(),
            cfg.timeout_secs,
            cfg.api_base.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_is_a_configuration_error() {
        let cfg = Config { api_key: None, ..Config::default() };
        assert!(matches!(make_provider(&cfg, "m"), Err(PlantError::Configuration(_))));
    }

    #[test]
    fn builds_configured_model() {
        let cfg = Config { api_key: Some("k".into()), ..Config::default() };
        let p = make_provider(&cfg, "gemini-test").unwrap();
        assert_eq!(p.model(), "gemini-test");

        let cfg = Config { api_key: Some("k".into()), provider: ProviderKind::OpenAI, ..Config::default() };
        let p = make_provider(&cfg, "gpt-test").unwrap();
        assert_eq!(p.model(), "gpt-test");
    }
}
