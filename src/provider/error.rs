use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {why}")]
    HttpClientError { why: &'static str, source: reqwest::Error },
    #[error("HTTP client error: {why}, {details}")]
    HttpClientErrorMessage { why: &'static str, details: String },
    #[error("failed to deserialize")]
    DeserializationError {
        #[from]
        source: serde_json::error::Error,
    },
    #[error("service {service_id} has no version metadata")]
    NoActiveVersion { service_id: String },
}
