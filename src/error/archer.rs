use thiserror::Error;

/// Failures surfaced synchronously by `HttpArcher::new` before any worker
/// starts. Per-request transport errors are never represented here; they are
/// counted, not raised.
#[derive(Debug, Error)]
pub enum ArcherError {
    #[error("Invalid target URL '{url}': {source}")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Target URL '{url}' has no host.")]
    TargetUrlMissingHost { url: String },
    #[error("Worker count must be at least 1.")]
    NoWorkers,
}
