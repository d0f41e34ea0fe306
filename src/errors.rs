use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlantError {
    #[error("configuration error: {0}")] Configuration(String),
    #[error("could not encode image: {0}")] Encoding(String),
    #[error("generation failed: {0}")] Generation(String),
    #[error("stored gallery is malformed: {0}")] StorageParse(String),
    #[error("storage error: {0}")] Storage(String),
    #[error("another request is still in flight")] Busy,
}

impl From<std::io::Error> for PlantError {
    fn from(e: std::io::Error) -> Self {
        PlantError::Storage(e.to_string())
    }
}
