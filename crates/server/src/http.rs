//! HTTP surface
//!
//! - `GET /health`
//! - `GET /stream`: live events as Server-Sent Events
//! - `GET /channel?subscribe_key=..[&publish_key=..]`: WebSocket bridge onto
//!   the message channel for edge devices; publishing needs the publish key
//! - `GET /images/{fob|tamper}/{file}`: retrieved evidence
//!
//! Streams and bridges end when shutdown starts, so a connected dashboard
//! never holds the server open.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, Stream, StreamExt};
use hostlock_bus::MessageChannel;
use hostlock_engine::{AccessService, ChannelConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    service: Arc<AccessService>,
    closing: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(service: Arc<AccessService>) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            service,
            closing: Arc::new(closing),
        }
    }

    /// End every open live stream and bridge connection
    pub fn close_streams(&self) {
        self.closing.send_replace(true);
    }

    /// Resolves once [`close_streams`](Self::close_streams) has been called
    fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.closing.subscribe();
        async move {
            let _ = rx.wait_for(|closed| *closed).await;
        }
    }
}

/// Serve the router until `signal` resolves, then close streams and drain
pub async fn serve_until<F>(listener: TcpListener, state: AppState, signal: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("Shutting down HTTP surface");
            state.close_streams();
        })
        .await
}

pub fn router(state: AppState) -> Router {
    let image_root = state.service.config().evidence.image_root.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/stream", get(stream_handler))
        .route("/channel", get(channel_handler))
        .nest_service("/images", ServeDir::new(image_root))
        .with_state(state)
        .layer(cors)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "channel": state.service.channel().name(),
        "live_subscribers": state.service.live().subscriber_count(),
    }))
}

async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.live().subscribe();

    let stream = tokio_stream::StreamExt::filter_map(BroadcastStream::new(rx), |result| {
        match result {
            Ok(payload) => Some(Ok(Event::default().data(payload))),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Live subscriber lagged");
                None
            }
        }
    })
    .take_until(state.closed());

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelParams {
    pub subscribe_key: Option<String>,
    pub publish_key: Option<String>,
}

/// What a bridge connection may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeAccess {
    Subscribe,
    SubscribeAndPublish,
}

/// Check bridge credentials; `None` means reject
pub fn authorize(config: &ChannelConfig, params: &ChannelParams) -> Option<BridgeAccess> {
    if params.subscribe_key.as_deref() != Some(config.subscribe_key.as_str()) {
        return None;
    }
    if params.publish_key.as_deref() == Some(config.publish_key.as_str()) {
        Some(BridgeAccess::SubscribeAndPublish)
    } else {
        Some(BridgeAccess::Subscribe)
    }
}

async fn channel_handler(
    Query(params): Query<ChannelParams>,
    State(state): State<AppState>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(access) = authorize(&state.service.config().channel, &params) else {
        tracing::warn!("Bridge connection with invalid subscribe key");
        return (StatusCode::UNAUTHORIZED, "invalid subscribe key").into_response();
    };

    match ws {
        Some(ws) => ws.on_upgrade(move |socket| bridge(socket, state, access)),
        None => (StatusCode::UPGRADE_REQUIRED, "websocket upgrade required").into_response(),
    }
}

/// Relay channel traffic to one edge device and its frames back
async fn bridge(socket: WebSocket, state: AppState, access: BridgeAccess) {
    let (mut sender, mut receiver) = socket.split();
    let channel = state.service.channel().clone();
    let mut subscription = channel.subscribe();

    tracing::info!(access = ?access, "Edge device connected");

    let send_task = tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            if sender.send(Message::Text(message.to_string())).await.is_err() {
                break;
            }
        }
    });

    let closed = state.closed();
    tokio::pin!(closed);

    loop {
        let result = tokio::select! {
            result = receiver.next() => result,
            _ = &mut closed => break,
        };
        let Some(result) = result else { break };

        match result {
            Ok(Message::Text(text)) => {
                if access != BridgeAccess::SubscribeAndPublish {
                    tracing::warn!("Publish attempt without publish key ignored");
                    continue;
                }
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        if let Err(e) = channel.publish(value).await {
                            tracing::warn!(error = %e, "Bridge publish failed");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Ignoring non-JSON frame"),
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!("Edge device disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChannelConfig {
        ChannelConfig {
            name: "door".to_string(),
            publish_key: "pub".to_string(),
            subscribe_key: "sub".to_string(),
            ..ChannelConfig::default()
        }
    }

    fn params(subscribe: Option<&str>, publish: Option<&str>) -> ChannelParams {
        ChannelParams {
            subscribe_key: subscribe.map(str::to_string),
            publish_key: publish.map(str::to_string),
        }
    }

    #[test]
    fn test_authorize() {
        let config = config();
        assert_eq!(authorize(&config, &params(None, None)), None);
        assert_eq!(authorize(&config, &params(Some("wrong"), Some("pub"))), None);
        assert_eq!(
            authorize(&config, &params(Some("sub"), None)),
            Some(BridgeAccess::Subscribe)
        );
        assert_eq!(
            authorize(&config, &params(Some("sub"), Some("wrong"))),
            Some(BridgeAccess::Subscribe)
        );
        assert_eq!(
            authorize(&config, &params(Some("sub"), Some("pub"))),
            Some(BridgeAccess::SubscribeAndPublish)
        );
    }
}
