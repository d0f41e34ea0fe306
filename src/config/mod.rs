use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Args, ProviderKind};
use crate::errors::PlantError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub provider: ProviderKind,
    pub model: String,
    pub chat_model: String,
    pub timeout_secs: u64,
    pub api_base: Option<String>,
    pub watch_interval_ms: u64,
    pub save_request: bool,
    pub save_response: bool,
    /// Read from the environment, never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: ".plantpal".into(),
            provider: ProviderKind::Gemini,
            model: "gemini-1.5-pro".into(),
            chat_model: "gemini-1.5-pro".into(),
            timeout_secs: 120,
            api_base: None,
            watch_interval_ms: 1000,
            save_request: false,
            save_response: false,
            api_key: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then CLI flags, then the credential from
    /// `env`.
    pub fn resolve(args: &Args, env: impl Fn(&str) -> Option<String>) -> Result<Self, PlantError> {
        let data_dir = args.data_dir.clone().unwrap_or_else(|| Config::default().data_dir);
        let file = match &args.config {
            Some(p) => Some(p.clone()),
            None => {
                let p = data_dir.join("config.toml");
                p.exists().then_some(p)
            }
        };

        let mut cfg = match file {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };

        if let Some(d) = &args.data_dir { cfg.data_dir = d.clone(); }
        if let Some(p) = args.provider { cfg.provider = p; }
        if let Some(m) = &args.model { cfg.model = m.clone(); }
        if let Some(m) = &args.chat_model { cfg.chat_model = m.clone(); }
        if let Some(t) = args.timeout_secs { cfg.timeout_secs = t; }
        cfg.save_request |= args.save_request;
        cfg.save_response |= args.save_response;

        cfg.api_key = Self::credential_vars(cfg.provider)
            .iter()
            .find_map(|k| env(k))
            .filter(|v| !v.trim().is_empty());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, PlantError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| PlantError::Configuration(e.to_string()))?;
        toml::from_str(&raw)
            .map_err(|e| PlantError::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn credential_vars(provider: ProviderKind) -> &'static [&'static str] {
        match provider {
            ProviderKind::Gemini => &["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"],
            ProviderKind::OpenAI => &["OPENAI_API_KEY"],
        }
    }

    pub fn api_key(&self) -> Result<String, PlantError> {
        self.api_key.clone().ok_or_else(|| {
            PlantError::Configuration(format!(
                "API key not found; set {}",
                Self::credential_vars(self.provider).join(" or ")
            ))
        })
    }
}
