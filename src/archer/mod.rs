//! Archer (client) side: the concurrent load generator.
//!
//! A fixed pool of rate-controlled workers shares one counter set and, when
//! a finite quota is configured, one quota token. Workers are otherwise
//! independent; dispatch order across workers is not coordinated.

mod worker;

#[cfg(test)]
mod tests;

pub use worker::request_wire_size;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::args::parse_interval;
use crate::error::{AppResult, ArcherError};
use crate::reporter::{ReportRole, emit_stats_line, spawn_stats_reporter};
use crate::shutdown::ShutdownSender;
use crate::signals::FlushReceiver;
use crate::stats::{QuotaToken, StatsSet, StatsSnapshot};

use worker::{WorkerContext, spawn_worker};

/// Immutable per-run request descriptor. Built once from configuration and
/// shared read-only across all workers; the body bytes and endpoint never
/// change during a run.
#[derive(Debug, Clone)]
pub struct ArcherConfig {
    pub target: String,
    pub interval: String,
    pub conn_num: usize,
    pub data: Vec<u8>,
    pub print_log: bool,
    pub print_error: bool,
    /// Total request quota across all workers; 0 means non-stop.
    pub num: u64,
}

pub struct HttpArcher {
    stats: Arc<StatsSet>,
    target: Url,
    host: String,
    interval: Duration,
    conn_num: usize,
    data: Arc<Vec<u8>>,
    print_error: bool,
    quota: Option<Arc<QuotaToken>>,
}

impl HttpArcher {
    /// Validates the endpoint and interval up front. This is the only
    /// synchronous failure mode; once workers are running, transport errors
    /// are counted, never raised.
    ///
    /// # Errors
    ///
    /// Returns `ArcherError` for an unparsable or host-less target URL or a
    /// zero worker count, and `ValidationError` for a bad interval string.
    pub fn new(config: &ArcherConfig) -> AppResult<Self> {
        let target = Url::parse(&config.target).map_err(|err| ArcherError::InvalidTargetUrl {
            url: config.target.clone(),
            source: err,
        })?;
        let host = host_with_port(&target).ok_or_else(|| ArcherError::TargetUrlMissingHost {
            url: config.target.clone(),
        })?;
        let interval = parse_interval(&config.interval)?;
        if config.conn_num == 0 {
            return Err(ArcherError::NoWorkers.into());
        }
        let quota = if config.num > 0 {
            Some(Arc::new(QuotaToken::new(config.num)))
        } else {
            None
        };
        Ok(Self {
            stats: Arc::new(StatsSet::new()),
            target,
            host,
            interval,
            conn_num: config.conn_num,
            data: Arc::new(config.data.clone()),
            print_error: config.print_error,
            quota,
        })
    }

    /// Spawns the worker pool and blocks until every worker has stopped,
    /// either by exhausting the quota or by observing a shutdown broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or a worker task
    /// panics.
    pub async fn launch(&self, shutdown_tx: &ShutdownSender) -> AppResult<()> {
        let client = Client::builder().build()?;
        let request_size = request_wire_size(&self.target, &self.host, self.data.len());

        let mut handles = Vec::with_capacity(self.conn_num);
        for _ in 0..self.conn_num {
            handles.push(spawn_worker(WorkerContext {
                stats: Arc::clone(&self.stats),
                quota: self.quota.clone(),
                client: client.clone(),
                target: self.target.clone(),
                host: self.host.clone(),
                data: Arc::clone(&self.data),
                interval: self.interval,
                request_size,
                print_error: self.print_error,
                shutdown_tx: shutdown_tx.clone(),
            }));
        }
        for handle in handles {
            handle.await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsSet> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn sent_bytes(&self) -> u64 {
        self.snapshot().sent_bytes
    }

    #[must_use]
    pub fn received_bytes(&self) -> u64 {
        self.snapshot().received_bytes
    }

    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.snapshot().succeeded
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.snapshot().failed
    }
}

/// Runs a full archer: the reporter plus the worker pool, with a final
/// stats line once the pool drains when periodic reporting is on.
///
/// # Errors
///
/// Returns the synchronous validation errors of [`HttpArcher::new`] or a
/// launch failure.
pub async fn start_http_archer(
    config: ArcherConfig,
    shutdown_tx: &ShutdownSender,
    flush_rx: FlushReceiver,
) -> AppResult<()> {
    let archer = HttpArcher::new(&config)?;
    let reporter = spawn_stats_reporter(
        archer.stats(),
        ReportRole::Archer,
        config.print_log,
        flush_rx,
    );
    let result = archer.launch(shutdown_tx).await;
    if config.print_log {
        emit_stats_line(ReportRole::Archer, &archer.stats);
    }
    reporter.abort();
    result
}

fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(url.port().map_or_else(
        || host.to_owned(),
        |port| format!("{}:{}", host, port),
    ))
}
