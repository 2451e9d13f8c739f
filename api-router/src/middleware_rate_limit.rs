use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use common::utils::config::RateLimitQuota;

use crate::{api_state::ApiState, error::ApiError};

/// Fixed-window request counter, one window per client key. Counters for a
/// window reset when the window elapses; stale keys are swept opportunistically
/// so the map does not grow without bound.
pub struct RateLimiter {
    quota: RateLimitQuota,
    windows: Mutex<HashMap<String, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(quota: RateLimitQuota) -> Self {
        Self {
            quota,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request against `key`. Returns false when the key has
    /// exhausted its quota for the current window.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another thread panicked mid-update;
            // the counters are still sound enough for limiting.
            Err(poisoned) => poisoned.into_inner(),
        };

        windows.retain(|_, window| now.duration_since(window.started) < self.quota.window * 2);

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.quota.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.quota.count {
            return false;
        }

        window.count += 1;
        true
    }
}

/// Keys the limiter by forwarded client address when a proxy provides one,
/// falling back to a single shared bucket.
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "global".to_string())
}

pub async fn rate_limit(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&request);
    if !state.limiter.try_acquire(&key) {
        return Err(ApiError::RateLimited(format!(
            "limit of {} requests per {:?} exceeded",
            state.config.rate_limit.count, state.config.rate_limit.window
        )));
    }

    Ok(next.run(request).await)
}
