use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clip_proto::protocol::{ApiError, ChannelId, StreamList};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::callback::CallbackSender;
use crate::registry::Registry;

#[derive(Clone)]
struct HttpState {
    registry: Registry,
    callbacks: CallbackSender,
}

#[derive(Deserialize)]
struct NotificationQuery {
    id: Option<String>,
}

pub fn router(registry: Registry, callbacks: CallbackSender) -> Router {
    Router::new()
        .route("/notification", get(notification_clicked))
        .route("/api/streams", get(list_streams))
        .route("/api/streams/:id/click", post(click_stream))
        .with_state(HttpState {
            registry,
            callbacks,
        })
}

/// Bind, then serve until `cancel` fires.  Returns the bound address, which
/// differs from the requested one when `port` is 0.
pub async fn start_server(
    bind_address: &str,
    port: u16,
    registry: Registry,
    callbacks: CallbackSender,
    cancel: CancellationToken,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    info!("HTTP API server listening on http://{}", local);

    let app = router(registry, callbacks);
    let handle = tokio::spawn(async move {
        let shutdown = async move { cancel.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP server error: {}", e);
        }
        info!("HTTP API server stopped");
    });
    Ok((local, handle))
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

async fn notification_clicked(
    State(state): State<HttpState>,
    Query(query): Query<NotificationQuery>,
) -> impl IntoResponse {
    let Some(id) = query.id.map(ChannelId::new).filter(|id| !id.is_empty()) else {
        warn!("notification callback without id");
        return bad_request("missing id").into_response();
    };

    info!("HTTP API: notification clicked [{}]", id);
    if state.callbacks.send(id).await.is_err() {
        error!("notification callback channel closed");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    StatusCode::OK.into_response()
}

async fn list_streams(State(state): State<HttpState>) -> Json<StreamList> {
    let mut entries = Vec::new();
    for item in state.registry.items().await {
        entries.push(item.entry().await);
    }
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    Json(StreamList { entries })
}

async fn click_stream(State(state): State<HttpState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = ChannelId::new(id);
    info!("HTTP API: click [{}]", id);
    let Some(item) = state.registry.get(&id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: format!("unknown stream {}", id),
            }),
        )
            .into_response();
    };
    if !item.is_visible().await {
        return (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: format!("{} is offline", id),
            }),
        )
            .into_response();
    }
    if item.click() {
        StatusCode::ACCEPTED.into_response()
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}
