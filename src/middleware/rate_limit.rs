//! Sliding-window rate limiting middleware.
//!
//! # Algorithm
//!
//! Each (client IP, category) pair holds a deque of request timestamps.
//! On every check, timestamps older than the category window are dropped
//! from the front; the request is allowed iff fewer than the category
//! limit remain. This gives exact sliding-window semantics: a burst is
//! never forgiven early the way fixed-window counters forgive it at the
//! window boundary.
//!
//! # Categories
//!
//! | Category   | Limit      | Window  |
//! |------------|------------|---------|
//! | Burst      | 10         | 10 s    |
//! | Per-minute | 60         | 60 s    |
//! | Per-hour   | 1000       | 3600 s  |
//! | Strict     | per-route  | 60 s    |
//!
//! Categories are tracked independently; consuming burst budget does not
//! touch the per-minute tally. Mutating routes carry a named `Strict`
//! gate with a route-specific limit on top of the global per-minute gate.
//!
//! # Response Headers
//!
//! The global per-minute layer stamps every response, success or not:
//! - `X-RateLimit-Limit`: per-minute limit
//! - `X-RateLimit-Remaining`: per-minute budget left for this client
//! - `X-RateLimit-Reset`: epoch seconds at which the oldest tracked
//!   request leaves the window
//!
//! Denials additionally carry `Retry-After` (set by the error renderer).
//!
//! # Memory
//!
//! Client entries are swept every 100 requests: expired timestamps are
//! pruned and clients with no live timestamps in any category are
//! removed, so idle IPs do not accumulate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::ip::resolve_client_ip;
use crate::error::AppError;

/// Sweep cadence, in requests observed by the limiter.
const SWEEP_EVERY: usize = 100;

/// Paths the global layer never counts against any budget.
///
/// Probes fire on a fixed cadence from orchestrators and would otherwise
/// eat into the prober's client budget.
const BYPASS_PATHS: &[&str] = &["/health", "/ready"];

// =============================================================================
// Categories
// =============================================================================

/// A rate-limit budget with its own limit and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Short-burst protection: 10 requests per 10 seconds.
    Burst,
    /// The standard per-client budget: 60 requests per minute.
    PerMinute,
    /// Long-horizon budget: 1000 requests per hour.
    PerHour,
    /// A per-route gate: `max` requests per minute, tracked separately
    /// per route `name`.
    Strict { name: &'static str, max: u32 },
}

impl Category {
    /// The window this category counts requests over.
    pub fn window(&self) -> Duration {
        match self {
            Category::Burst => Duration::from_secs(10),
            Category::PerMinute | Category::Strict { .. } => Duration::from_secs(60),
            Category::PerHour => Duration::from_secs(3600),
        }
    }

    /// Maximum requests allowed inside the window.
    pub fn limit(&self) -> u32 {
        match self {
            Category::Burst => 10,
            Category::PerMinute => 60,
            Category::PerHour => 1000,
            Category::Strict { max, .. } => *max,
        }
    }

    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Burst => "burst",
            Category::PerMinute => "per_minute",
            Category::PerHour => "per_hour",
            Category::Strict { name, .. } => name,
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; `remaining` is the budget left after it.
    Allowed { remaining: u32 },
    /// Request refused; retry no sooner than `retry_after` seconds.
    Denied { retry_after: u64 },
}

// =============================================================================
// Sliding-Window Limiter
// =============================================================================

/// Per-client, per-category sliding-window request tracker.
///
/// Thread-safe; a single instance is shared across the middleware stack
/// through [`Arc`]. When constructed disabled, every check allows the
/// request without recording anything.
pub struct SlidingWindowLimiter {
    clients: Mutex<HashMap<String, HashMap<Category, VecDeque<Instant>>>>,
    enabled: bool,
    requests_seen: AtomicUsize,
}

impl SlidingWindowLimiter {
    /// Create a limiter. `enabled = false` turns every check into a
    /// no-op allow (debug mode, tests).
    pub fn new(enabled: bool) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            enabled,
            requests_seen: AtomicUsize::new(0),
        }
    }

    /// Whether checks actually consume budget.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check the budget for `client` under `category` and, if allowed,
    /// record the request.
    pub fn check_and_record(&self, client: &str, category: Category) -> Decision {
        self.check_and_record_at(client, category, Instant::now())
    }

    /// Clock-injected variant of [`Self::check_and_record`].
    pub fn check_and_record_at(&self, client: &str, category: Category, now: Instant) -> Decision {
        if !self.enabled {
            return Decision::Allowed {
                remaining: category.limit(),
            };
        }

        let mut clients = self.lock_clients();

        // Periodic sweep keeps idle clients from accumulating
        let seen = self.requests_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % SWEEP_EVERY == 0 {
            Self::sweep_map(&mut clients, now);
        }

        let window = category.window();
        let limit = category.limit() as usize;

        let timestamps = clients
            .entry(client.to_string())
            .or_default()
            .entry(category)
            .or_default();

        Self::prune(timestamps, window, now);

        if timestamps.len() >= limit {
            let retry_after = timestamps
                .front()
                .map(|oldest| Self::secs_until_expiry(*oldest, window, now))
                .unwrap_or(1);
            return Decision::Denied { retry_after };
        }

        timestamps.push_back(now);
        Decision::Allowed {
            remaining: (limit - timestamps.len()) as u32,
        }
    }

    /// Remaining budget for `client` under `category`, without recording.
    pub fn remaining(&self, client: &str, category: Category) -> u32 {
        self.remaining_at(client, category, Instant::now())
    }

    /// Clock-injected variant of [`Self::remaining`].
    pub fn remaining_at(&self, client: &str, category: Category, now: Instant) -> u32 {
        if !self.enabled {
            return category.limit();
        }

        let clients = self.lock_clients();
        let window = category.window();
        let live = clients
            .get(client)
            .and_then(|budgets| budgets.get(&category))
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|t| now.duration_since(**t) < window)
                    .count()
            })
            .unwrap_or(0);

        (category.limit() as usize).saturating_sub(live) as u32
    }

    /// Seconds until the oldest live request for `client` under
    /// `category` leaves the window. Zero when nothing is tracked.
    pub fn reset_after(&self, client: &str, category: Category) -> u64 {
        self.reset_after_at(client, category, Instant::now())
    }

    /// Clock-injected variant of [`Self::reset_after`].
    pub fn reset_after_at(&self, client: &str, category: Category, now: Instant) -> u64 {
        if !self.enabled {
            return 0;
        }

        let clients = self.lock_clients();
        let window = category.window();
        clients
            .get(client)
            .and_then(|budgets| budgets.get(&category))
            .and_then(|timestamps| {
                timestamps
                    .iter()
                    .find(|t| now.duration_since(**t) < window)
                    .map(|oldest| Self::secs_until_expiry(*oldest, window, now))
            })
            .unwrap_or(0)
    }

    /// Number of distinct client IPs currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock_clients().len()
    }

    /// Drop expired timestamps and empty clients immediately.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        Self::sweep_map(&mut self.lock_clients(), now);
    }

    fn sweep_map(clients: &mut HashMap<String, HashMap<Category, VecDeque<Instant>>>, now: Instant) {
        let before = clients.len();
        clients.retain(|_, budgets| {
            budgets.retain(|category, timestamps| {
                Self::prune(timestamps, category.window(), now);
                !timestamps.is_empty()
            });
            !budgets.is_empty()
        });
        let removed = before - clients.len();
        if removed > 0 {
            debug!(removed, tracked = clients.len(), "Swept idle rate-limit clients");
        }
    }

    fn prune(timestamps: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whole seconds until `oldest + window`, rounded up, at least 1.
    fn secs_until_expiry(oldest: Instant, window: Duration, now: Instant) -> u64 {
        let elapsed = now.duration_since(oldest);
        let left = window.saturating_sub(elapsed);
        let secs = if left.subsec_nanos() > 0 {
            left.as_secs() + 1
        } else {
            left.as_secs()
        };
        secs.max(1)
    }

    /// A poisoned lock only means another thread panicked mid-update;
    /// the timestamp data is still usable, so recover the guard.
    fn lock_clients(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<Category, VecDeque<Instant>>>> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// Tower Layer
// =============================================================================

/// Rate limiting layer.
///
/// Two flavours share the implementation:
///
/// - [`RateLimitLayer::global`] enforces the per-minute budget on every
///   route and stamps `X-RateLimit-*` headers on every response that
///   passes through it, including 429s produced by inner gates.
/// - [`RateLimitLayer::strict`] and [`RateLimitLayer::per_hour`] are
///   route-level gates that only deny; header stamping is left to the
///   global layer wrapping them.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<SlidingWindowLimiter>,
    category: Category,
    stamp_headers: bool,
}

impl RateLimitLayer {
    /// The router-wide per-minute gate. Apply once, outside the route
    /// gates, so its headers cover their denials too.
    pub fn global(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            limiter,
            category: Category::PerMinute,
            stamp_headers: true,
        }
    }

    /// A named per-route gate allowing `max` requests per minute.
    pub fn strict(limiter: Arc<SlidingWindowLimiter>, name: &'static str, max: u32) -> Self {
        Self {
            limiter,
            category: Category::Strict { name, max },
            stamp_headers: false,
        }
    }

    /// The per-hour gate for expensive read endpoints.
    pub fn per_hour(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self {
            limiter,
            category: Category::PerHour,
            stamp_headers: false,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            category: self.category,
            stamp_headers: self.stamp_headers,
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<SlidingWindowLimiter>,
    category: Category,
    stamp_headers: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let category = self.category;
        let stamp_headers = self.stamp_headers;
        let mut inner = self.inner.clone();

        let client_ip = resolve_client_ip(&req).into_owned();
        let path = req.uri().path().to_string();

        Box::pin(async move {
            let bypass = stamp_headers && BYPASS_PATHS.contains(&path.as_str());

            if !bypass {
                if let Decision::Denied { retry_after } =
                    limiter.check_and_record(&client_ip, category)
                {
                    warn!(
                        client_ip = %client_ip,
                        path = %path,
                        category = category.label(),
                        retry_after_secs = retry_after,
                        "Rate limit exceeded"
                    );
                    crate::metrics::record_rate_limit_denial(category.label());

                    let mut response = AppError::RateLimitExceeded { retry_after }.into_response();
                    if stamp_headers {
                        stamp_rate_limit_headers(&mut response, &limiter, &client_ip, category);
                    }
                    return Ok(response);
                }
            }

            let mut response = inner.call(req).await?;
            if stamp_headers {
                stamp_rate_limit_headers(&mut response, &limiter, &client_ip, category);
            }
            Ok(response)
        })
    }
}

/// Attach `X-RateLimit-Limit` / `-Remaining` / `-Reset` to a response.
/// Reset is reported as epoch seconds.
fn stamp_rate_limit_headers(
    response: &mut Response<Body>,
    limiter: &SlidingWindowLimiter,
    client_ip: &str,
    category: Category,
) {
    let remaining = limiter.remaining(client_ip, category);
    let epoch_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let reset = epoch_now + limiter.reset_after(client_ip, category);

    let headers = response.headers_mut();
    for (name, value) in [
        ("x-ratelimit-limit", category.limit().to_string()),
        ("x-ratelimit-remaining", remaining.to_string()),
        ("x-ratelimit-reset", reset.to_string()),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
