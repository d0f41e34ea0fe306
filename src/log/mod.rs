use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::wire::EncodedImage;

pub const LOG_ENV: &str = "PLANTPAL_LOG";

/// Stderr subscriber filtered by `PLANTPAL_LOG`, falling back to `warn`
/// (or `debug` with `--debug`).
pub fn init_tracing(debug: bool) {
    let fallback = if debug { "plantpal=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Image summary stored in artifacts instead of the payload.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub mime_type: String,
    pub bytes: usize,
}

impl From<&EncodedImage> for ImageSummary {
    fn from(img: &EncodedImage) -> Self {
        Self { mime_type: img.mime_type.clone(), bytes: img.byte_len() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRequest {
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeResponse {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

/// Writes each AI exchange under `<data_dir>/tx/<id>/`.
#[derive(Debug, Clone)]
pub struct ExchangeLog {
    dir: PathBuf,
    save_request: bool,
    save_response: bool,
}

fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join("tx").join(tx.to_string())
}

impl ExchangeLog {
    /// `None` when neither side is being saved.
    pub fn new(data_dir: &Path, save_request: bool, save_response: bool) -> Option<Self> {
        (save_request || save_response).then(|| Self {
            dir: tx_dir(data_dir, Uuid::new_v4()),
            save_request,
            save_response,
        })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_stage(
        &self,
        stage: &str,
        req: &ExchangeRequest,
        resp: &ExchangeResponse,
    ) -> anyhow::Result<SavedPaths> {
        fs::create_dir_all(&self.dir)?;

        let mut request_path = None;
        let mut response_path = None;

        if self.save_request {
            let p = self.dir.join(format!("{stage}.request.json"));
            fs::write(&p, to_string_pretty(req)?)?;
            request_path = Some(p);
        }

        if self.save_response {
            let p = self.dir.join(format!("{stage}.response.json"));
            fs::write(&p, to_string_pretty(resp)?)?;
            response_path = Some(p);
        }

        Ok(SavedPaths { dir: self.dir.clone(), request: request_path, response: response_path })
    }

    /// Artifacts are best effort; a failed write is logged, not returned.
    pub fn record(&self, stage: &str, req: &ExchangeRequest, resp: &ExchangeResponse) {
        match self.save_stage(stage, req, resp) {
            Ok(saved) => debug!(
                stage,
                dir = %saved.dir.display(),
                request = saved.request.is_some(),
                response = saved.response.is_some(),
                "saved exchange artifacts"
            ),
            Err(e) => warn!(stage, error = %e, "could not save exchange artifacts"),
        }
    }

    pub fn record_outcome<E: std::fmt::Display>(
        &self,
        stage: &str,
        model: &str,
        prompt: &str,
        image: Option<&EncodedImage>,
        outcome: &Result<String, E>,
    ) {
        let req = ExchangeRequest {
            model: model.to_string(),
            timestamp: Utc::now(),
            prompt: prompt.to_string(),
            image: image.map(ImageSummary::from),
        };
        let resp = match outcome {
            Ok(text) => ExchangeResponse { timestamp: Utc::now(), text: Some(text.clone()), error: None },
            Err(e) => ExchangeResponse { timestamp: Utc::now(), text: None, error: Some(e.to_string()) },
        };
        self.record(stage, &req, &resp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExchangeRequest {
        ExchangeRequest {
            model: "m".into(),
            timestamp: Utc::now(),
            prompt: "p".into(),
            image: Some(ImageSummary::from(&EncodedImage::from_bytes("image/png", b"hello"))),
        }
    }

    #[test]
    fn disabled_when_nothing_is_saved() {
        assert!(ExchangeLog::new(Path::new("."), false, false).is_none());
    }

    #[test]
    fn writes_only_requested_sides() {
        let dir = tempfile::tempdir().unwrap();
        let log = ExchangeLog::new(dir.path(), false, true).unwrap();
        let resp = ExchangeResponse { timestamp: Utc::now(), text: Some("A fern".into()), error: None };
        let saved = log.save_stage("identify", &request(), &resp).unwrap();

        assert!(saved.request.is_none());
        let body = std::fs::read_to_string(saved.response.unwrap()).unwrap();
        assert!(body.contains("A fern"));
        assert!(saved.dir.starts_with(dir.path().join("tx")));
    }

    #[test]
    fn request_artifact_summarizes_image() {
        let dir = tempfile::tempdir().unwrap();
        let log = ExchangeLog::new(dir.path(), true, false).unwrap();
        let resp = ExchangeResponse { timestamp: Utc::now(), text: None, error: Some("boom".into()) };
        let saved = log.save_stage("chat", &request(), &resp).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(saved.request.unwrap()).unwrap()).unwrap();
        assert_eq!(v["image"]["mime_type"], "image/png");
        assert_eq!(v["image"]["bytes"], 5);
    }
}
