use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::HOST;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::shutdown::ShutdownSender;
use crate::stats::{QuotaToken, StatsSet};

/// Everything one rate-controlled worker needs. Workers are independent
/// apart from the shared counter set and quota token.
pub(super) struct WorkerContext {
    pub stats: Arc<StatsSet>,
    pub quota: Option<Arc<QuotaToken>>,
    pub client: Client,
    pub target: Url,
    pub host: String,
    pub data: Arc<Vec<u8>>,
    pub interval: Duration,
    /// Serialized request size, computed once since the body never changes.
    pub request_size: u64,
    pub print_error: bool,
    pub shutdown_tx: ShutdownSender,
}

/// One worker: sleep the fixed interval, claim a quota slot when a quota is
/// set, issue one request, classify the outcome. Stops when the quota is
/// spent or a shutdown broadcast is observed between iterations; a failed
/// request is counted and never stops the loop.
pub(super) fn spawn_worker(ctx: WorkerContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown_rx = ctx.shutdown_tx.subscribe();
        loop {
            if ctx.interval.is_zero() {
                // Back-to-back dispatch; still poll for shutdown between
                // iterations.
                match shutdown_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Closed) => break,
                    Err(TryRecvError::Empty | TryRecvError::Lagged(_)) => {}
                }
            } else {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    () = sleep(ctx.interval) => {}
                }
            }

            if let Some(quota) = ctx.quota.as_ref() {
                if !quota.try_acquire() {
                    break;
                }
            }

            match issue_request(&ctx).await {
                Ok(received) => {
                    ctx.stats.add_succeeded();
                    ctx.stats.add_sent_bytes(ctx.request_size);
                    ctx.stats.add_received_bytes(received);
                }
                Err(err) => {
                    ctx.stats.add_failed();
                    if ctx.print_error {
                        info!("client request error: {}", err);
                    } else {
                        debug!("client request error: {}", err);
                    }
                }
            }
        }
    })
}

/// Issues one PUT and returns the received byte count: response header bytes
/// plus body length. Any response counts as success; only transport
/// failures (connect, timeout, protocol) surface as errors here.
async fn issue_request(ctx: &WorkerContext) -> Result<u64, reqwest::Error> {
    let response = ctx
        .client
        .put(ctx.target.clone())
        .header(HOST, ctx.host.as_str())
        .body(ctx.data.as_ref().clone())
        .send()
        .await?;
    let header_bytes = response_header_size(&response);
    let body = response.bytes().await?;
    Ok(header_bytes.saturating_add(body.len() as u64))
}

/// Serialized size of the fixed PUT request the worker sends: request line,
/// Host and Content-Length headers, blank line, body.
#[must_use]
pub fn request_wire_size(target: &Url, host: &str, body_len: usize) -> u64 {
    let query_len = target
        .query()
        .map_or(0, |query| query.len().saturating_add(1));
    let request_line = "PUT  HTTP/1.1\r\n"
        .len()
        .saturating_add(target.path().len())
        .saturating_add(query_len);
    let host_header = "host: \r\n".len().saturating_add(host.len());
    let length_header = "content-length: \r\n"
        .len()
        .saturating_add(body_len.to_string().len());

    (request_line
        .saturating_add(host_header)
        .saturating_add(length_header)
        .saturating_add(2) // blank line
        .saturating_add(body_len)) as u64
}

/// Serialized size of the response status line and headers, mirroring
/// [`request_wire_size`] on the receive path.
fn response_header_size(response: &reqwest::Response) -> u64 {
    let reason = response.status().canonical_reason().unwrap_or("");
    // "HTTP/1.1 200 OK\r\n"
    let mut size = "HTTP/1.1  \r\n"
        .len()
        .saturating_add(3)
        .saturating_add(reason.len()) as u64;
    for (name, value) in response.headers() {
        size = size
            .saturating_add(name.as_str().len() as u64)
            .saturating_add(2) // ": "
            .saturating_add(value.len() as u64)
            .saturating_add(2); // CRLF
    }
    size.saturating_add(2) // terminating CRLF
}
