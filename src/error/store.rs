use thiserror::Error;

/// Aggregation-store failures. Everything except endpoint/client setup is
/// recoverable: the publisher logs and retries on its next tick.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid store endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Store endpoint '{endpoint}' cannot carry a request path.")]
    OpaqueEndpoint { endpoint: String },
    #[error("Failed to encode put '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to build store client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to put '{key}': {source}")]
    Put {
        key: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Store rejected put '{key}' with status {status}.")]
    PutStatus { key: String, status: u16 },
}
