//! HTTP middleware pipeline.
//!
//! Requests traverse the stack in this order:
//!
//! ```text
//! Request → Security Headers → Request ID → Rate Limit (per-minute)
//!         → [route gates: auth → strict rate limit → validation]
//!         → Handler
//! ```
//!
//! The per-minute limit runs before authentication, so a flood of
//! unauthorized requests is cut off by the cheap timestamp check instead
//! of reaching the credential table; route-strict budgets sit behind the
//! auth gate and are only consumed by authorized callers. Denials from
//! any stage render the standard error envelope; the per-minute layer
//! stamps `X-RateLimit-*` headers and the security-headers layer stamps
//! its set on every response, including those denials.

pub mod auth;
pub mod ip;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod validate;

pub use auth::{ApiKeyAuthLayer, AuthContext, Credential, CredentialStore, Permission};
pub use ip::{FALLBACK_CLIENT_IP, resolve_client_ip};
pub use rate_limit::{Category, Decision, RateLimitLayer, SlidingWindowLimiter};
pub use request_id::{RequestId, RequestIdLayer};
pub use security_headers::SecurityHeadersLayer;
pub use validate::ValidateJsonLayer;
