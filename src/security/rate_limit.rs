//! Fixed-window per-client rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::http::response::ErrorBody;
use crate::net::{self, X_FORWARDED_FOR};
use crate::observability::metrics;
use crate::souls::ClientKey;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Longest accepted window. Longer configured windows are clamped to it.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Counter for one key within its current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Result of [`RateLimiter::admit`]. Reported whether or not the request was
/// allowed, so a rejected caller still sees accurate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: Instant,
    /// Wall-clock equivalent of `reset_at`, for response headers.
    pub reset_at_unix: u64,
}

impl RateDecision {
    /// Write the `X-RateLimit-*` headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at_unix));
    }
}

/// In-memory fixed-window limiter shared by every request.
///
/// The whole map sits behind one mutex. Critical sections only touch the
/// map; nothing that can block on I/O runs while it is held.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window: window.min(MAX_WINDOW),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Count a request for `key` and decide whether it may proceed.
    pub fn admit(&self, key: &str) -> RateDecision {
        self.admit_at(key, Instant::now())
    }

    /// [`RateLimiter::admit`] with an explicit clock reading.
    pub fn admit_at(&self, key: &str, now: Instant) -> RateDecision {
        let (allowed, state) = {
            let mut windows = self.lock();
            let current = match windows.get_mut(key) {
                Some(state) if now < state.reset_at => {
                    let allowed = state.count < self.max_requests;
                    if allowed {
                        state.count += 1;
                    }
                    Some((allowed, *state))
                }
                _ => None,
            };
            current.unwrap_or_else(|| {
                let fresh = Window {
                    count: 1,
                    reset_at: now.checked_add(self.window).unwrap_or(now),
                };
                windows.insert(key.to_string(), fresh);
                (true, fresh)
            })
        };

        RateDecision {
            allowed,
            remaining: self.max_requests.saturating_sub(state.count),
            limit: self.max_requests,
            reset_at: state.reset_at,
            reset_at_unix: unix_seconds(state.reset_at, now),
        }
    }

    /// Drop every window that has expired by `now`. Returns how many were evicted.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, state| now < state.reset_at);
        before - windows.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    // Counters are plain integers, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start the periodic expiry sweep. It runs once per window and stops on
    /// shutdown or once the last strong reference to the limiter is dropped.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        let period = self.window;

        tokio::spawn(async move {
            let start = time::Instant::now();
            let mut ticker = time::interval_at(start.checked_add(period).unwrap_or(start), period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(limiter) = limiter.upgrade() else {
                            break;
                        };
                        let evicted = limiter.sweep_at(Instant::now());
                        let tracked = limiter.tracked_keys();
                        metrics::record_rate_limit_keys(tracked);
                        tracing::debug!(evicted, tracked, "Rate limit sweep");
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

fn unix_seconds(at: Instant, now: Instant) -> u64 {
    let wall = SystemTime::now() + at.saturating_duration_since(now);
    wall.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// State handed to [`rate_limit_middleware`].
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trust_forwarded: bool,
}

/// First stage of the pipeline. Resolves the client key, records it on the
/// request for later stages, and rejects over-budget clients with 429.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<RateLimitState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    let key = net::resolve_socket(addr, forwarded, state.trust_forwarded);

    let decision = state.limiter.admit(&key);
    if !decision.allowed {
        tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            ErrorBody::new("rate limit"),
        )
            .into_response();
        decision.apply_headers(response.headers_mut());
        return response;
    }

    request.extensions_mut().insert(ClientKey(key));
    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
