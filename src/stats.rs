//! Shared counter set and dispatch quota accounting.
//!
//! Every counter is an independent `AtomicU64` mutated with relaxed
//! fetch-and-add; no cross-field transaction exists or is needed. A snapshot
//! therefore tolerates tearing across fields while each field stays
//! individually consistent. Counters are cumulative for the process lifetime
//! and are never reset.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

/// Point-in-time view of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent_bytes: u64,
    pub received_bytes: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub request_count: u64,
    pub live_connections: u64,
}

/// Counter set shared by the workers, the acceptor, the request handler, the
/// reporter, and the publisher. All fields are monotonic except
/// `live_connections`, which rises on accept and falls on close.
#[derive(Debug, Default)]
pub struct StatsSet {
    sent_bytes: AtomicU64,
    received_bytes: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    request_count: AtomicU64,
    live_connections: AtomicU64,
}

impl StatsSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sent_bytes(&self, bytes: u64) {
        self.sent_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_received_bytes(&self, bytes: u64) {
        self.received_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.live_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection close, flooring the live count at zero.
    ///
    /// An over-decrement means a close was accounted without a matching
    /// accept. That is a lifecycle bug in the caller, so it is surfaced with
    /// a warning instead of wrapping the unsigned counter around.
    pub fn connection_closed(&self) {
        let floored = self
            .live_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
        if floored.is_err() {
            warn!("connection close recorded without a matching accept");
        }
    }

    /// Reads all counters. Each field is individually consistent; cross-field
    /// consistency is not guaranteed while writers are in flight.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent_bytes: self.sent_bytes.load(Ordering::Relaxed),
            received_bytes: self.received_bytes.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            request_count: self.request_count.load(Ordering::Relaxed),
            live_connections: self.live_connections.load(Ordering::Relaxed),
        }
    }
}

/// Cross-worker dispatch budget. `try_acquire` is a single atomic
/// test-and-increment, so exactly `limit` acquisitions ever succeed no
/// matter how many workers race on it.
#[derive(Debug)]
pub struct QuotaToken {
    limit: u64,
    dispatched: AtomicU64,
}

impl QuotaToken {
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            dispatched: AtomicU64::new(0),
        }
    }

    /// Claims one dispatch slot. Returns `false` once the quota is spent.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.dispatched
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                if count < self.limit {
                    count.checked_add(1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
