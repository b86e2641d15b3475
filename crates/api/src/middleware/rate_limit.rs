//! # Rate Limiting Middleware
//!
//! Fixed-window request counting per client IP and path. Limiters are plain
//! values owned by `ApiState`; the router wires one per tier.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bookit_core::errors::BookError;
use chrono::Utc;
use dashmap::DashMap;

use crate::middleware::error_handling::AppError;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_ms: i64,
}

impl RateLimitRule {
    /// Login and registration.
    pub const AUTH: RateLimitRule = RateLimitRule {
        max_requests: 5,
        window_ms: 15 * 60 * 1000,
    };

    pub const GENERAL: RateLimitRule = RateLimitRule {
        max_requests: 60,
        window_ms: 60 * 1000,
    };
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    reset_at_ms: i64,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds at which the window resets.
    pub reset_at_ms: i64,
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    rule: RateLimitRule,
    windows: DashMap<String, WindowState>,
}

impl RateLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            windows: DashMap::new(),
        }
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now().timestamp_millis())
    }

    /// Counts a request for `key` at `now_ms` (epoch milliseconds).
    pub fn check_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let mut window = self.windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            reset_at_ms: now_ms + self.rule.window_ms,
        });

        if now_ms > window.reset_at_ms {
            *window = WindowState {
                count: 0,
                reset_at_ms: now_ms + self.rule.window_ms,
            };
        }
        window.count = window.count.saturating_add(1);

        let allowed = window.count <= self.rule.max_requests;
        let retry_after_ms = (window.reset_at_ms - now_ms).max(0);
        RateLimitDecision {
            allowed,
            limit: self.rule.max_requests,
            remaining: self.rule.max_requests.saturating_sub(window.count),
            reset_at_ms: window.reset_at_ms,
            retry_after_secs: (retry_after_ms as u64).div_ceil(1000),
        }
    }

    /// Removes windows that have already reset. Returns how many were dropped.
    pub fn prune_expired(&self, now_ms: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now_ms <= window.reset_at_ms);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Best guess at the caller's address from proxy headers.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }
    header("x-real-ip")
        .or_else(|| header("cf-connecting-ip"))
        .unwrap_or("127.0.0.1")
        .to_string()
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let values = [
        (LIMIT_HEADER, decision.limit.to_string()),
        (REMAINING_HEADER, decision.remaining.to_string()),
        (RESET_HEADER, decision.reset_at_ms.to_string()),
    ];
    for (name, value) in values {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}

/// Counts the request against `limiter` and either rejects it with 429 or
/// forwards it, stamping the rate limit headers on the response.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = format!("{}:{}", client_ip(request.headers()), request.uri().path());
    let decision = limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!("Rate limit exceeded for {}", key);
        AppError(BookError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        })
        .into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}
