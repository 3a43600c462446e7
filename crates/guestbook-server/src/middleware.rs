//! Rate limiting for password verification.
//!
//! A fixed-window counter keyed by client IP. Requests without connection
//! info share one bucket. Expired buckets are pruned lazily, at most once
//! per window.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Allowed { remaining: u32 },
    /// The bucket is full until `retry_after` elapses.
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct Buckets {
    by_client: HashMap<Option<IpAddr>, Bucket>,
    last_prune: Instant,
}

/// Allows `max` requests per client per `window`.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    window: Duration,
    max: u32,
    buckets: Mutex<Buckets>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            buckets: Mutex::new(Buckets {
                by_client: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Count a request from `client` and decide whether it may proceed.
    pub async fn check(&self, client: Option<IpAddr>) -> Decision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        if now.duration_since(buckets.last_prune) >= self.window {
            let window = self.window;
            buckets
                .by_client
                .retain(|_, b| now.duration_since(b.started) < window);
            buckets.last_prune = now;
        }

        let bucket = buckets.by_client.entry(client).or_insert(Bucket {
            started: now,
            count: 0,
        });

        if now.duration_since(bucket.started) >= self.window {
            *bucket = Bucket {
                started: now,
                count: 0,
            };
        }

        if bucket.count >= self.max {
            let retry_after = self.window.saturating_sub(now.duration_since(bucket.started));
            return Decision::Limited { retry_after };
        }

        bucket.count = bucket.count.saturating_add(1);
        Decision::Allowed {
            remaining: self.max.saturating_sub(bucket.count),
        }
    }

    /// Number of tracked clients.
    pub async fn tracked(&self) -> usize {
        self.buckets.lock().await.by_client.len()
    }
}

/// Middleware applying [`AppState::limiter`] to the wrapped routes.
pub async fn rate_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match state.limiter.check(client).await {
        Decision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.limiter.max()),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );
            response
        }
        Decision::Limited { retry_after } => {
            warn!(
                client = ?client,
                retry_after_secs = retry_after.as_secs(),
                "rate limit exceeded"
            );
            AppError::TooManyRequests { retry_after }.into_response()
        }
    }
}
