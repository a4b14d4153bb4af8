use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config;
use crate::error::ApiError;

/// Fixed request window per client key
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count a hit for `key`; `false` once the window's budget is spent.
    pub async fn check(&self, key: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;

        // drop stale windows so the map does not grow without bound
        if clients.len() > 10_000 {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }
}

static LIMITER: Lazy<RateLimiter> = Lazy::new(|| {
    let api = &config::config().api;
    RateLimiter::new(api.rate_limit_requests, Duration::from_millis(api.rate_limit_window_ms))
});

/// Per-client fixed-window limiter for `/api` routes, active when enabled in config
pub async fn rate_limit_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    if !config::config().api.enable_rate_limiting {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request);
    if !LIMITER.check(&key, Instant::now()).await {
        tracing::warn!("Rate limit exceeded for {}", key);
        return Err(ApiError::too_many_requests("Too many requests, please try again later"));
    }

    Ok(next.run(request).await)
}

/// First X-Forwarded-For hop, else the peer address
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_budget_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check("10.0.0.1", now).await);
        assert!(limiter.check("10.0.0.1", now).await);
        assert!(!limiter.check("10.0.0.1", now).await);
        // other clients have their own budget
        assert!(limiter.check("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let now = Instant::now();
        assert!(limiter.check("a", now).await);
        assert!(!limiter.check("a", now).await);
        assert!(limiter.check("a", now + Duration::from_secs(2)).await);
    }
}
