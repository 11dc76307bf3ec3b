use std::net::TcpListener;

use url::Url;

use super::{ArcherConfig, HttpArcher, request_wire_size, start_http_archer};
use crate::shutdown::shutdown_channel;
use crate::signals::flush_channel;

fn base_config(target: &str) -> ArcherConfig {
    ArcherConfig {
        target: target.to_owned(),
        interval: "100ms".to_owned(),
        conn_num: 10,
        data: Vec::new(),
        print_log: false,
        print_error: false,
        num: 0,
    }
}

#[test]
fn rejects_invalid_target_url_before_launch() {
    let config = base_config("not a url");
    assert!(HttpArcher::new(&config).is_err());
}

#[test]
fn rejects_target_url_without_host() {
    let config = base_config("unix:/tmp/socket");
    assert!(HttpArcher::new(&config).is_err());
}

#[test]
fn rejects_invalid_interval_before_launch() {
    let mut config = base_config("http://127.0.0.1:8080/");
    config.interval = "tenseconds".to_owned();
    assert!(HttpArcher::new(&config).is_err());
}

#[test]
fn rejects_zero_workers() {
    let mut config = base_config("http://127.0.0.1:8080/");
    config.conn_num = 0;
    assert!(HttpArcher::new(&config).is_err());
}

#[test]
fn accepts_zero_interval() -> Result<(), String> {
    let mut config = base_config("http://127.0.0.1:8080/");
    config.interval = "0".to_owned();
    HttpArcher::new(&config).map_err(|err| format!("new failed: {}", err))?;
    Ok(())
}

#[test]
fn request_wire_size_counts_line_headers_and_body() -> Result<(), String> {
    let target = Url::parse("http://example.com:8080/bench?x=1")
        .map_err(|err| format!("url parse failed: {}", err))?;
    let size = request_wire_size(&target, "example.com:8080", 3);

    // "PUT /bench?x=1 HTTP/1.1\r\n" (25) + "host: example.com:8080\r\n" (24)
    // + "content-length: 3\r\n" (19) + "\r\n" (2) + body (3)
    assert_eq!(size, 73);
    Ok(())
}

#[test]
fn request_wire_size_is_body_length_dependent_only_through_body() -> Result<(), String> {
    let target =
        Url::parse("http://h/").map_err(|err| format!("url parse failed: {}", err))?;
    let empty = request_wire_size(&target, "h", 0);
    let ten = request_wire_size(&target, "h", 10);
    // 10 body bytes plus one extra Content-Length digit.
    assert_eq!(ten, empty.saturating_add(11));
    Ok(())
}

#[test]
fn unreachable_target_counts_failures_not_successes() -> Result<(), String> {
    // Bind and immediately drop a listener so the port is very likely
    // closed; every request should be a connect failure.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0")
            .map_err(|err| format!("bind failed: {}", err))?;
        listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?
            .port()
    };

    let mut config = base_config(&format!("http://127.0.0.1:{}/", port));
    config.interval = "0".to_owned();
    config.conn_num = 2;
    config.num = 6;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime build failed: {}", err))?;
    runtime.block_on(async {
        let archer = HttpArcher::new(&config).map_err(|err| format!("new failed: {}", err))?;
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        archer
            .launch(&shutdown_tx)
            .await
            .map_err(|err| format!("launch failed: {}", err))?;

        assert_eq!(archer.failed(), 6);
        assert_eq!(archer.succeeded(), 0);
        assert_eq!(archer.sent_bytes(), 0);
        assert_eq!(archer.received_bytes(), 0);
        Ok::<(), String>(())
    })
}

#[test]
fn start_http_archer_surfaces_validation_synchronously() -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime build failed: {}", err))?;
    runtime.block_on(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let (_flush_tx, flush_rx) = flush_channel();
        let result = start_http_archer(base_config("::"), &shutdown_tx, flush_rx).await;
        assert!(result.is_err());
        Ok(())
    })
}
