//! End-to-end behavior of the reader: the document pipeline through the HTTP
//! router, and the binary's startup and exit codes.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use peerpad_reader::api::INVOCATION_COUNT_HEADER;
use peerpad_reader::config::{ReaderConfig, URL_VAR};
use peerpad_reader::overlay::WireMessage;
use peerpad_reader::{MemoryOverlay, ReaderNode, SessionState, UriKeyDecoder};
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn config(vars: &[(&str, &str)]) -> ReaderConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ReaderConfig::from_lookup(|var| vars.get(var).cloned()).unwrap()
}

async fn get(node: &ReaderNode, path: &str) -> (StatusCode, String, String) {
    let response = node
        .router()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let count = response
        .headers()
        .get(INVOCATION_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, count, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn converged_document_is_rendered() {
    let config = config(&[
        (URL_VAR, "#/w/markdown/doc1/keyABC"),
        ("PEER_PAD_RENDER_DELAY_MS", "0"),
    ]);
    let overlay = Arc::new(MemoryOverlay::new());
    let node = ReaderNode::with_parts(config, overlay.clone(), Arc::new(UriKeyDecoder));

    let bootstrap = node.session().spawn_bootstrap();

    // Content trickles in, the title arrives later.
    let content = overlay.feed("doc1").await;
    let title = overlay.feed("doc1/title").await;
    content.set("Hello ");
    content.set("Hello World");
    title.set("My Title");

    bootstrap.await.unwrap().unwrap();
    assert!(matches!(node.session().state(), SessionState::Ready(_)));

    let (status, count, body) = get(&node, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count, "1");
    assert!(body.contains("<title>My Title</title>"));
    assert!(body.contains("<p>Hello World</p>"));

    let (_, count, _) = get(&node, "/some/other/path").await;
    assert_eq!(count, "2");

    let stats = overlay.stats();
    assert_eq!((stats.starts, stats.collaborations, stats.subs), (1, 1, 1));
}

#[test]
fn missing_url_exits_with_code_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_read-peer-pad"))
        .env_remove(URL_VAR)
        .env("PEER_PAD_API_ADDR", "127.0.0.1:0")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PEER_PAD_URL is not set"));
    assert!(!stderr.contains("HTTP server listening"));
}

#[test]
fn print_mode_reports_bootstrap_failure() {
    let output = Command::new(env!("CARGO_BIN_EXE_read-peer-pad"))
        .arg("--print")
        .env(URL_VAR, "https://peerpad.net/#/w/markdown/doc1/mfrgg")
        .env_remove("PEER_PAD_PEERS")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Exception: failed to join network: no peers reachable"));
}

#[tokio::test]
async fn print_mode_prints_document_from_peer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        // hello, then one subscribe each for the content and the title
        let mut received = Vec::new();
        for _ in 0..3 {
            let line = lines.next_line().await.unwrap().unwrap();
            received.push(serde_json::from_str::<WireMessage>(&line).unwrap());
        }

        for (collaboration, value) in [("doc1", "Hello World"), ("doc1/title", "My Title")] {
            let state = WireMessage::State {
                collaboration: collaboration.to_string(),
                value: value.to_string(),
            };
            let mut line = serde_json::to_string(&state).unwrap();
            line.push('\n');
            writer.write_all(line.as_bytes()).await.unwrap();
        }

        // Hold the connection until the reader exits.
        while let Ok(Some(_)) = lines.next_line().await {}
        received
    });

    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_read-peer-pad"))
        .arg("--print")
        .env(URL_VAR, "https://peerpad.net/#/w/markdown/doc1/keyABC")
        .env("PEER_PAD_PEERS", &addr)
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Title: My Title\n\nHello World\n"
    );

    let received = peer.await.unwrap();
    assert!(matches!(&received[0], WireMessage::Hello { app } if app == "peer-pad/2"));
    assert!(matches!(
        &received[1],
        WireMessage::Subscribe { collaboration, kind, key }
            if collaboration == "doc1" && kind == "rga" && key == "keyABC"
    ));
    assert!(matches!(&received[2], WireMessage::Subscribe { collaboration, .. } if collaboration == "doc1/title"));
}
