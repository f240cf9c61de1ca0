//! Rate limit middleware
//!
//! Admits or rejects each request before it reaches a handler. Rejected
//! requests get `429 Too Many Requests` with a `Retry-After` hint and never
//! touch the stores.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::handlers::AppState;
use crate::models::ErrorResponse;
use crate::ratelimit::client_identity;

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // Absent when the router is served without connect info (tests, some proxies)
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), remote, state.trust_proxy_headers);

    if state.limiter.admit(&identity) {
        return next.run(request).await;
    }

    warn!(client = %identity, limit = state.limiter.limit(), "rate limit exceeded");
    let retry_after = state
        .limiter
        .retry_after(&identity)
        .map_or(1, |wait| wait.as_secs().max(1));

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse::new("Too many requests")),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}
