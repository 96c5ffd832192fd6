//! Tests over a real TCP connection, where hyper encodes and flushes the
//! chunked body itself.

mod common;

use std::sync::Arc;

use server::{build_router, AppState};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use common::*;

async fn spawn(generator: ScriptedGenerator) -> std::net::SocketAddr {
    let app = build_router(AppState::new(Arc::new(generator), test_config()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Send a raw generate request and read everything until the server closes.
async fn raw_generate(addr: std::net::SocketAddr, body: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /api/generate HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    let _ = socket.read_to_end(&mut raw).await;
    String::from_utf8_lossy(&raw).into_owned()
}

fn source_body() -> String {
    serde_json::json!({ "sourceText": VALID_SOURCE }).to_string()
}

#[tokio::test]
async fn test_partial_output_reaches_the_wire_before_abort() {
    let addr = spawn(ScriptedGenerator::steps(vec![
        Step::Text("First paragraph. ".into()),
        Step::Fail("upstream reset".into()),
    ]))
    .await;

    let wire = raw_generate(addr, &source_body()).await;

    assert!(wire.starts_with("HTTP/1.1 200 OK"), "{wire:?}");
    assert!(wire.contains("First paragraph. "), "{wire:?}");
    // Aborted: the terminating zero-length chunk is never written
    assert!(!wire.ends_with("0\r\n\r\n"), "{wire:?}");
}

#[tokio::test]
async fn test_open_failure_still_sends_status_line() {
    let addr = spawn(ScriptedGenerator::failing_open("overloaded")).await;

    let wire = raw_generate(addr, &source_body()).await;

    assert!(wire.starts_with("HTTP/1.1 200 OK"), "{wire:?}");
    assert!(!wire.ends_with("0\r\n\r\n"), "{wire:?}");
}

#[tokio::test]
async fn test_clean_completion_ends_chunked_body() {
    let addr = spawn(ScriptedGenerator::texts(&["Hook. ", "Body. ", "#a #b #c"])).await;

    let wire = raw_generate(addr, &source_body()).await;

    assert!(wire.starts_with("HTTP/1.1 200 OK"), "{wire:?}");
    assert!(wire.to_ascii_lowercase().contains("transfer-encoding: chunked"));
    assert!(wire.ends_with("0\r\n\r\n"), "{wire:?}");
    for part in ["Hook. ", "Body. ", "#a #b #c"] {
        assert!(wire.contains(part));
    }
}
