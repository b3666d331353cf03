//! Loopback endpoint the login completion page posts its payload to.
//!
//! The desktop app has no `window.opener`, so the service's popup page
//! delivers the payload here instead. The `Origin` header becomes the message
//! origin; whether it is trusted is decided by the session sync, not here.

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    routing::post,
    Json, Router,
};
use courier_security::MessageSubscription;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

pub const MESSAGE_PATH: &str = "/auth/message";
const MAX_BODY_BYTES: usize = 64 * 1024;
const REQUEST_TIMEOUT_SECS: u64 = 10;

pub fn router(messages: MessageSubscription, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .context("service origin is not a valid header value")?;

    Ok(Router::new()
        .route(MESSAGE_PATH, post(deliver_message))
        .with_state(Arc::new(messages))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        ))
}

/// Serve the relay on an already bound listener until the task is aborted.
pub async fn serve(
    listener: TcpListener,
    messages: MessageSubscription,
    allowed_origin: String,
) -> anyhow::Result<()> {
    let app = router(messages, &allowed_origin)?;
    axum::serve(listener, app)
        .await
        .context("login relay stopped")
}

async fn deliver_message(
    State(messages): State<Arc<MessageSubscription>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    let Some(origin) = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::debug!("relay message without origin");
        return StatusCode::BAD_REQUEST;
    };

    if messages.deliver(origin, payload) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
