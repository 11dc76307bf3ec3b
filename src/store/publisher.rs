use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::warn;

use crate::stats::StatsSet;

use super::StatsStore;

/// Fixed period between aggregation publishes.
pub const PUBLISH_PERIOD: Duration = Duration::from_secs(1);

/// Metric names; each key is namespaced by node identity as
/// `<metric>/<node>` so concurrent target nodes never collide.
const METRIC_CONN_NUM: &str = "conn_num";
const METRIC_RECEIVED_BYTES: &str = "received_bytes";
const METRIC_REQUEST_COUNT: &str = "request_count";

/// Spawns the publisher loop. Store failures degrade aggregation, never
/// serving: every tick retries all fields regardless of past errors.
#[must_use]
pub fn spawn_stats_publisher(
    store: Arc<dyn StatsStore>,
    stats: Arc<StatsSet>,
    node: String,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            publish_once(store.as_ref(), &stats, &node).await;
        }
    })
}

/// Writes one snapshot into the store. Each field is an independent write;
/// a failure is logged and the remaining fields still go out.
pub async fn publish_once(store: &dyn StatsStore, stats: &StatsSet, node: &str) {
    let snapshot = stats.snapshot();
    let fields = [
        (METRIC_CONN_NUM, snapshot.live_connections),
        (METRIC_RECEIVED_BYTES, snapshot.received_bytes),
        (METRIC_REQUEST_COUNT, snapshot.request_count),
    ];
    for (metric, value) in fields {
        let key = format!("{}/{}", metric, node);
        if let Err(err) = store.put(&key, &value.to_string()).await {
            warn!("failed to publish {}: {}", key, err);
        }
    }
}
