//! Photo in, gallery record out.
//!
//! `identify` is one sequential pipeline: encode the file, ask the provider,
//! append the record. The two awaits are the only suspension points; dropping
//! the future before the append leaves the gallery untouched.

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::PlantError;
use crate::flight::Flight;
use crate::log::ExchangeLog;
use crate::prompt::build_identification_prompt;
use crate::provider::DynProvider;
use crate::store::PlantStore;
use crate::wire::{EncodedImage, PlantRecord};

pub const PLACEHOLDER_NAME: &str = "Sample Plant";
pub const PLACEHOLDER_SCIENTIFIC_NAME: &str = "Plantus Exampleus";
pub const PLACEHOLDER_CARE: [&str; 3] = ["Water regularly", "Indirect sunlight", "Well-draining soil"];

/// User-facing message for any failed identification.
pub const FAILURE_NOTICE: &str = "Error identifying plant. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifyState {
    Idle,
    Encoding,
    Requesting,
    Succeeded(PlantRecord),
    Failed(String),
}

pub struct IdentificationFlow {
    store: Arc<PlantStore>,
    provider: DynProvider,
    exchange_log: Option<ExchangeLog>,
    state: Mutex<IdentifyState>,
    flight: Flight,
}

impl IdentificationFlow {
    pub fn new(store: Arc<PlantStore>, provider: DynProvider) -> Self {
        Self {
            store,
            provider,
            exchange_log: None,
            state: Mutex::new(IdentifyState::Idle),
            flight: Flight::default(),
        }
    }

    pub fn with_exchange_log(mut self, log: Option<ExchangeLog>) -> Self {
        self.exchange_log = log;
        self
    }

    pub fn state(&self) -> IdentifyState {
        let state = self.state.lock().clone();
        match state {
            // left behind by an abandoned attempt
            IdentifyState::Encoding | IdentifyState::Requesting if !self.flight.is_active() => IdentifyState::Idle,
            s => s,
        }
    }

    /// Back to `Idle` after a finished attempt. No-op while one is running.
    #[cfg(test)]
    pub fn reset(&self) {
        if !self.flight.is_active() {
            *self.state.lock() = IdentifyState::Idle;
        }
    }

    fn set_state(&self, s: IdentifyState) {
        *self.state.lock() = s;
    }

    pub async fn identify(&self, image_path: &Path) -> Result<PlantRecord, PlantError> {
        let _guard = self.flight.try_begin().ok_or(PlantError::Busy)?;
        self.set_state(IdentifyState::Idle);

        let outcome = self.run(image_path).await;
        match &outcome {
            Ok(record) => {
                info!(image = %image_path.display(), "plant identified and saved");
                self.set_state(IdentifyState::Succeeded(record.clone()));
            }
            Err(e) => {
                warn!(image = %image_path.display(), error = %e, "identification failed");
                self.set_state(IdentifyState::Failed(e.to_string()));
            }
        }
        outcome
    }

    async fn run(&self, image_path: &Path) -> Result<PlantRecord, PlantError> {
        self.set_state(IdentifyState::Encoding);
        let image = encode_image(image_path).await?;

        self.set_state(IdentifyState::Requesting);
        let prompt = build_identification_prompt();
        let outcome = self.provider.generate(prompt, Some(&image)).await;
        if let Some(log) = &self.exchange_log {
            log.record_outcome("identify", self.provider.model(), prompt, Some(&image), &outcome);
        }
        let description = outcome?;

        // The model's answer is kept verbatim; name, scientific name and care
        // are fixed placeholders.
        let record = PlantRecord {
            name: PLACEHOLDER_NAME.to_string(),
            scientific_name: PLACEHOLDER_SCIENTIFIC_NAME.to_string(),
            description,
            care: PLACEHOLDER_CARE.iter().map(|s| s.to_string()).collect(),
            image: image.to_data_url(),
        };
        self.store.append(record.clone())?;
        Ok(record)
    }
}

/// Reads an image file into a data URL payload. The mime type is guessed from
/// the extension and must be `image/*`.
pub async fn encode_image(path: &Path) -> Result<EncodedImage, PlantError> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_().as_str() == "image")
        .ok_or_else(|| PlantError::Encoding(format!("{} is not a recognized image type", path.display())))?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PlantError::Encoding(format!("{}: {e}", path.display())))?;
    if bytes.is_empty() {
        return Err(PlantError::Encoding(format!("{} is empty", path.display())));
    }
    Ok(EncodedImage::from_bytes(mime.essence_str(), &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::{GatedProvider, ScriptedProvider};
    use crate::store::MemorySlot;
    use std::path::PathBuf;

    fn photo(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    fn store() -> Arc<PlantStore> {
        Arc::new(PlantStore::new(MemorySlot::default()))
    }

    #[tokio::test]
    async fn success_appends_placeholder_record_with_raw_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "fern.jpg", b"jpegbytes");
        let store = store();
        let provider = Arc::new(ScriptedProvider::new([Ok("1) Boston fern ...".to_string())]));
        let flow = IdentificationFlow::new(store.clone(), provider.clone());

        let record = flow.identify(&path).await.unwrap();
        assert_eq!(record.name, PLACEHOLDER_NAME);
        assert_eq!(record.scientific_name, PLACEHOLDER_SCIENTIFIC_NAME);
        assert_eq!(record.description, "1) Boston fern ...");
        assert_eq!(record.care.len(), 3);
        assert_eq!(record.image, EncodedImage::from_bytes("image/jpeg", b"jpegbytes").to_data_url());
        assert_eq!(store.load(), vec![record.clone()]);
        assert_eq!(flow.state(), IdentifyState::Succeeded(record));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, build_identification_prompt());
        assert_eq!(calls[0].image.as_ref().unwrap().mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn provider_failure_leaves_gallery_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "fern.png", b"png");
        let store = store();
        store
            .append(PlantRecord {
                name: "Old".into(),
                scientific_name: "Old sp.".into(),
                description: "d".into(),
                care: vec!["c".into()],
                image: "data:image/png;base64,AAAA".into(),
            })
            .unwrap();
        let before = store.load();

        let provider = Arc::new(ScriptedProvider::new([Err(PlantError::Generation("quota".into()))]));
        let flow = IdentificationFlow::new(store.clone(), provider);

        let err = flow.identify(&path).await.unwrap_err();
        assert_eq!(err, PlantError::Generation("quota".into()));
        assert_eq!(store.load(), before);
        assert!(matches!(flow.state(), IdentifyState::Failed(_)));

        flow.reset();
        assert_eq!(flow.state(), IdentifyState::Idle);
    }

    #[tokio::test]
    async fn unreadable_file_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new([Ok("never".to_string())]));
        let store = store();
        let flow = IdentificationFlow::new(store.clone(), provider.clone());

        let missing = dir.path().join("missing.jpg");
        assert!(matches!(flow.identify(&missing).await, Err(PlantError::Encoding(_))));

        let not_image = photo(dir.path(), "notes.txt", b"hello");
        assert!(matches!(flow.identify(&not_image).await, Err(PlantError::Encoding(_))));

        let empty = photo(dir.path(), "empty.png", b"");
        assert!(matches!(flow.identify(&empty).await, Err(PlantError::Encoding(_))));

        assert!(matches!(flow.state(), IdentifyState::Failed(_)));
        assert!(provider.calls().is_empty());
        assert!(store.load().is_empty());
    }

    #[tokio::test]
    async fn concurrent_identify_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "fern.jpg", b"jpeg");
        let store = store();
        let provider = Arc::new(GatedProvider::new("a fern"));
        let flow = Arc::new(IdentificationFlow::new(store.clone(), provider.clone()));

        let first = {
            let flow = flow.clone();
            let path = path.clone();
            tokio::spawn(async move { flow.identify(&path).await })
        };
        provider.wait_entered().await;
        assert_eq!(flow.state(), IdentifyState::Requesting);
        assert_eq!(flow.identify(&path).await, Err(PlantError::Busy));

        provider.open();
        first.await.unwrap().unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_attempt_stores_nothing_and_frees_the_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "fern.jpg", b"jpeg");
        let store = store();
        let provider = Arc::new(GatedProvider::new("a fern"));
        let flow = Arc::new(IdentificationFlow::new(store.clone(), provider.clone()));

        let task = {
            let flow = flow.clone();
            let path = path.clone();
            tokio::spawn(async move { flow.identify(&path).await })
        };
        provider.wait_entered().await;
        task.abort();
        let _ = task.await;

        assert!(store.load().is_empty());
        assert_eq!(flow.state(), IdentifyState::Idle);

        provider.open();
        assert!(flow.identify(&path).await.is_ok());
    }

    #[tokio::test]
    async fn exchange_artifacts_are_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "fern.jpg", b"jpeg");
        let log = ExchangeLog::new(dir.path(), true, true).unwrap();
        let tx_dir = log.dir().to_path_buf();
        let provider = Arc::new(ScriptedProvider::new([Ok("a fern".to_string())]));
        let flow = IdentificationFlow::new(store(), provider).with_exchange_log(Some(log));

        flow.identify(&path).await.unwrap();
        assert!(tx_dir.join("identify.request.json").exists());
        assert!(tx_dir.join("identify.response.json").exists());
    }
}
