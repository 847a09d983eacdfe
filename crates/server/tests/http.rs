//! HTTP surface against a running in-memory service

use hostlock_bus::LocalChannel;
use hostlock_engine::{AccessService, HostlockConfig, ServiceComponents, ServiceHandle};
use hostlock_evidence::MemoryBlobStore;
use hostlock_server::{router, serve_until, AppState};
use hostlock_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

struct Server {
    base: String,
    _handle: ServiceHandle,
    _images: TempDir,
}

async fn service(images: &TempDir) -> ServiceHandle {
    let mut config = HostlockConfig::default();
    config.channel.name = "door".to_string();
    config.channel.publish_key = "pub".to_string();
    config.channel.subscribe_key = "sub".to_string();
    config.evidence.image_root = images.path().to_path_buf();

    AccessService::start_with(
        config,
        ServiceComponents {
            store: Store::in_memory().await.unwrap(),
            channel: Arc::new(LocalChannel::new("door")),
            blobs: Arc::new(MemoryBlobStore::new()),
            matcher: None,
        },
    )
    .unwrap()
}

async fn start() -> Server {
    let images = TempDir::new().unwrap();
    std::fs::create_dir_all(images.path().join("fob")).unwrap();
    std::fs::write(images.path().join("fob/snap.jpg"), b"jpeg").unwrap();

    let handle = service(&images).await;

    let app = router(AppState::new(handle.service().clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        base: format!("http://{addr}"),
        _handle: handle,
        _images: images,
    }
}

#[tokio::test]
async fn test_health() {
    let server = start().await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["channel"], "door");
}

#[tokio::test]
async fn test_serves_retrieved_images() {
    let server = start().await;

    let response = reqwest::get(format!("{}/images/fob/snap.jpg", server.base))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"jpeg");

    let missing = reqwest::get(format!("{}/images/tamper/snap.jpg", server.base))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_channel_bridge_requires_subscribe_key() {
    let server = start().await;

    let denied = reqwest::get(format!("{}/channel?subscribe_key=nope", server.base))
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    // Right key but a plain request: the bridge only speaks WebSocket
    let plain = reqwest::get(format!("{}/channel?subscribe_key=sub", server.base))
        .await
        .unwrap();
    assert_eq!(plain.status(), 426);
}

#[tokio::test]
async fn test_shutdown_with_live_stream_attached() {
    let images = TempDir::new().unwrap();
    let handle = service(&images).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_until(
        listener,
        AppState::new(handle.service().clone()),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let dashboard = reqwest::get(format!("http://{addr}/stream")).await.unwrap();
    assert_eq!(dashboard.status(), 200);

    stop_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(3), server)
        .await
        .expect("serve did not return with a live stream attached")
        .unwrap()
        .unwrap();

    // The stream was ended, not left dangling
    tokio::time::timeout(Duration::from_secs(3), dashboard.bytes())
        .await
        .unwrap()
        .unwrap();

    handle.shutdown().await.unwrap();
}
