//! Per-client token-bucket rate limiting

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use super::tracing::client_ip;
use crate::error::ErrorResponse;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    fn try_consume(&mut self, tokens_per_second: f64, max_tokens: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * tokens_per_second).min(max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared rate limiter, keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    tokens_per_second: f64,
    max_tokens: f64,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` with a burst of twice that
    pub fn new(requests_per_second: u32) -> Self {
        let rps = f64::from(requests_per_second.max(1));
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            tokens_per_second: rps,
            max_tokens: rps * 2.0,
        }
    }

    /// Consume one token for `key`; false when the bucket is empty
    pub async fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.max_tokens));

        bucket.try_consume(self.tokens_per_second, self.max_tokens)
    }

    /// Drop buckets idle for longer than `max_age` (call periodically)
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
        before - buckets.len()
    }
}

/// Rate limiting middleware, used with `from_fn_with_state`
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = client_key(request.headers());

    if !limiter.check(&client_key).await {
        tracing::warn!(client = %client_key, "Rate limit exceeded");
        let body = ErrorResponse {
            success: false,
            error: "Too many requests. Please try again later.".to_string(),
            code: "TOO_MANY_REQUESTS".to_string(),
        };
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            Json(body),
        )
            .into_response();
    }

    next.run(request).await
}

fn client_key(headers: &HeaderMap) -> String {
    client_ip(headers).unwrap_or_else(|| "unknown".to_string())
}
