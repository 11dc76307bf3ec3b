//! End-to-end loopback runs: an in-process target served on an ephemeral
//! port with an archer pool driving it.

use std::sync::Arc;

use arbalest::archer::{ArcherConfig, HttpArcher, request_wire_size};
use arbalest::shutdown::shutdown_channel;
use arbalest::stats::StatsSet;
use arbalest::target::{TrackedListener, serve};

struct TargetHandle {
    stats: Arc<StatsSet>,
    task: tokio::task::JoinHandle<arbalest::error::AppResult<()>>,
    addr: std::net::SocketAddr,
}

impl Drop for TargetHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn spawn_target() -> Result<TargetHandle, String> {
    let stats = Arc::new(StatsSet::new());
    let listener = TrackedListener::bind("127.0.0.1:0", Arc::clone(&stats))
        .await
        .map_err(|err| format!("bind failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("local_addr failed: {}", err))?;
    let task = tokio::spawn(serve(listener, Arc::clone(&stats)));
    Ok(TargetHandle { stats, task, addr })
}

fn build_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| format!("runtime build failed: {}", err))
}

#[test]
fn quota_run_is_exact_and_sized() -> Result<(), String> {
    const QUOTA: u64 = 10_000;
    const BODY: &[u8] = b"ping!";

    let runtime = build_runtime()?;
    runtime.block_on(async {
        let target = spawn_target().await?;
        let endpoint = format!("http://{}/", target.addr);

        let config = ArcherConfig {
            target: endpoint.clone(),
            interval: "0".to_owned(),
            conn_num: 10,
            data: BODY.to_vec(),
            print_log: false,
            print_error: false,
            num: QUOTA,
        };
        let archer = HttpArcher::new(&config).map_err(|err| format!("new failed: {}", err))?;
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        archer
            .launch(&shutdown_tx)
            .await
            .map_err(|err| format!("launch failed: {}", err))?;

        assert_eq!(archer.succeeded(), QUOTA);
        assert_eq!(archer.failed(), 0);

        let url = url::Url::parse(&endpoint).map_err(|err| format!("url failed: {}", err))?;
        let host = format!("{}", target.addr);
        let per_request = request_wire_size(&url, &host, BODY.len());
        assert_eq!(archer.sent_bytes(), QUOTA.saturating_mul(per_request));

        // Every dispatched request was served and accounted by the target.
        assert_eq!(target.stats.snapshot().request_count, QUOTA);
        assert!(archer.received_bytes() > 0);
        Ok(())
    })
}

#[test]
fn throttled_quota_run_drains_exactly() -> Result<(), String> {
    const QUOTA: u64 = 40;

    let runtime = build_runtime()?;
    runtime.block_on(async {
        let target = spawn_target().await?;
        let config = ArcherConfig {
            target: format!("http://{}/", target.addr),
            interval: "1ms".to_owned(),
            conn_num: 4,
            data: Vec::new(),
            print_log: false,
            print_error: false,
            num: QUOTA,
        };
        let archer = HttpArcher::new(&config).map_err(|err| format!("new failed: {}", err))?;
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        archer
            .launch(&shutdown_tx)
            .await
            .map_err(|err| format!("launch failed: {}", err))?;

        let snapshot = archer.snapshot();
        assert_eq!(
            snapshot.succeeded.saturating_add(snapshot.failed),
            QUOTA,
            "quota must account every dispatch exactly once"
        );
        Ok(())
    })
}

#[test]
fn shutdown_broadcast_stops_an_unbounded_run() -> Result<(), String> {
    let runtime = build_runtime()?;
    runtime.block_on(async {
        let target = spawn_target().await?;
        let config = ArcherConfig {
            target: format!("http://{}/", target.addr),
            interval: "1ms".to_owned(),
            conn_num: 2,
            data: Vec::new(),
            print_log: false,
            print_error: false,
            num: 0,
        };
        let archer = Arc::new(HttpArcher::new(&config).map_err(|err| format!("new failed: {}", err))?);
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();

        let launcher = {
            let archer = Arc::clone(&archer);
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move { archer.launch(&shutdown_tx).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(shutdown_tx.send(()));

        tokio::time::timeout(std::time::Duration::from_secs(5), launcher)
            .await
            .map_err(|err| format!("workers did not stop: {}", err))?
            .map_err(|err| format!("join failed: {}", err))?
            .map_err(|err| format!("launch failed: {}", err))?;

        assert!(archer.succeeded() > 0);
        Ok(())
    })
}

#[test]
fn live_connections_settle_after_a_run() -> Result<(), String> {
    let runtime = build_runtime()?;
    runtime.block_on(async {
        let target = spawn_target().await?;

        // Open one raw connection, observe it counted, close it without
        // sending a request, observe the count settle back to zero.
        let client = tokio::net::TcpStream::connect(target.addr)
            .await
            .map_err(|err| format!("connect failed: {}", err))?;

        let counted = wait_until(|| target.stats.snapshot().live_connections == 1).await;
        if !counted {
            return Err("connection was never counted live".to_owned());
        }

        drop(client);
        let settled = wait_until(|| target.stats.snapshot().live_connections == 0).await;
        if !settled {
            return Err("connection close was never counted".to_owned());
        }
        assert_eq!(target.stats.snapshot().request_count, 0);
        Ok(())
    })
}

async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    false
}
