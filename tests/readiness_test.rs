mod common;

use common::*;
use service_harness::readiness::{always_ready, readiness_fn, HttpChecker, TcpChecker};
use service_harness::{Container, Context, Error, ReadinessChecker, Settings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Launch `name` on a fake engine that publishes container port 80 on `host_port`
/// of the loopback interface.
async fn launched(name: &str, host_port: u16, checker: impl ReadinessChecker + 'static) -> Container {
    let engine = FakeEngine::new()
        .with_gateway("127.0.0.1")
        .with_host_port("80", host_port)
        .shared();
    let c = container(name, checker);
    c.start(&Context::background(), engine).await.unwrap();
    c
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn tcp_ready_when_connection_is_held_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let checker = TcpChecker::new("80").with_settle(Duration::from_millis(50));
    let c = launched("tcp-open", port, checker.clone()).await;

    assert!(checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn tcp_not_ready_when_connection_is_dropped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    let checker = TcpChecker::new("80").with_settle(Duration::from_millis(500));
    let c = launched("tcp-proxy", port, checker.clone()).await;

    assert!(!checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn tcp_not_ready_when_nothing_listens() {
    let port = free_port().await;
    let checker = TcpChecker::new("80").with_settings(&Settings::default());
    let c = launched("tcp-closed", port, checker.clone()).await;

    assert!(!checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn tcp_unpublished_port_is_fatal() {
    let checker = TcpChecker::new("6379");
    let c = launched("tcp-missing", free_port().await, checker.clone()).await;

    let err = checker.check(&Context::background(), &c.view()).await.unwrap_err();
    assert!(matches!(err, Error::PortNotExposed { .. }));
}

/// Minimal HTTP server answering every request with `status`.
async fn serve_status(status: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    port
}

#[tokio::test]
async fn http_ready_on_success_status() {
    let port = serve_status("200 OK").await;
    let checker = HttpChecker::new("80", "health");
    let c = launched("http-ok", port, checker.clone()).await;

    assert!(checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn http_not_ready_on_error_status() {
    let port = serve_status("503 Service Unavailable").await;
    let checker = HttpChecker::new("80", "/health");
    let c = launched("http-unavailable", port, checker.clone()).await;

    assert!(!checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn http_not_ready_when_unreachable() {
    let checker = HttpChecker::new("80", "/").with_timeout(Duration::from_millis(500));
    let c = launched("http-down", free_port().await, checker.clone()).await;

    assert!(!checker.check(&Context::background(), &c.view()).await.unwrap());
}

#[tokio::test]
async fn closure_checker_sees_resolved_address() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));

    let checker = {
        let seen = seen.clone();
        let calls = calls.clone();
        readiness_fn(move |_ctx, view| {
            let seen = seen.clone();
            let calls = calls.clone();
            async move {
                seen.lock().push(view.address("redis", "80")?);
                Ok::<_, Error>(calls.fetch_add(1, Ordering::SeqCst) >= 1)
            }
        })
    };

    let c = launched("closure", 6400, checker).await;
    c.wait_ready(&timeout(Duration::from_secs(5))).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(seen.lock()[0], "redis://127.0.0.1:6400");
}

#[tokio::test]
async fn always_ready_needs_a_single_check() {
    let c = launched("noop", free_port().await, always_ready()).await;
    c.wait_ready(&Context::background()).await.unwrap();
    assert!(c.is_ready());
}
