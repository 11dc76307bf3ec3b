//! Periodic and signal-triggered stats reporting.
//!
//! One task per process selects over a periodic timer (armed only when
//! periodic reporting is enabled) and the external flush channel fed by
//! SIGHUP. Either trigger takes one snapshot and emits one line. The
//! reporter only ever reads the counter set; it never blocks producers and
//! never resets anything.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

use crate::signals::FlushReceiver;
use crate::stats::{StatsSet, StatsSnapshot};

/// Fixed period between periodic stats lines.
pub const REPORT_PERIOD: Duration = Duration::from_secs(5);

/// Which line format a process emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportRole {
    Archer,
    Target,
}

#[must_use]
pub fn format_stats_line(role: ReportRole, snapshot: &StatsSnapshot) -> String {
    match role {
        ReportRole::Archer => format!(
            "Sent Bytes: {}, Received Bytes: {}, Succeeded: {}, Failed: {}",
            snapshot.sent_bytes, snapshot.received_bytes, snapshot.succeeded, snapshot.failed
        ),
        ReportRole::Target => format!(
            "ConnNum: {}, Received Bytes: {}, Request Count: {}",
            snapshot.live_connections, snapshot.received_bytes, snapshot.request_count
        ),
    }
}

pub fn emit_stats_line(role: ReportRole, stats: &StatsSet) {
    info!("{}", format_stats_line(role, &stats.snapshot()));
}

/// Spawns the reporter task. The task ends when the flush channel closes.
#[must_use]
pub fn spawn_stats_reporter(
    stats: Arc<StatsSet>,
    role: ReportRole,
    periodic: bool,
    mut flush_rx: FlushReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(REPORT_PERIOD);
        // The first tick completes immediately; consume it so the first
        // periodic line lands a full period after startup.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick(), if periodic => emit_stats_line(role, &stats),
                flush = flush_rx.recv() => match flush {
                    Some(()) => emit_stats_line(role, &stats),
                    None => break,
                },
            }
        }
    })
}
