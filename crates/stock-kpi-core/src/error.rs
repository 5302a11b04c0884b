use thiserror::Error;

#[derive(Debug, Error)]
pub enum KpiError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for KpiError {
    fn from(e: serde_json::Error) -> Self {
        KpiError::SerializationError(e.to_string())
    }
}
