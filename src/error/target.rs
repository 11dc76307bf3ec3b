use thiserror::Error;

/// Fatal failures on the serving side: the target cannot start without its
/// listener and has no more work once accepting fails.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Failed to bind '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read local address: {source}")]
    LocalAddr {
        #[source]
        source: std::io::Error,
    },
    #[error("Accept failed: {source}")]
    Accept {
        #[source]
        source: std::io::Error,
    },
}
