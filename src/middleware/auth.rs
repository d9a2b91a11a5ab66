//! API key authentication and permission enforcement.
//!
//! # Credential Model
//!
//! A static table maps API keys to a role and a permission set. Roles
//! are not hierarchical: a gate checks for the exact permission it
//! needs, never for a role rank. The built-in roles are:
//!
//! | Role     | Permissions                  |
//! |----------|------------------------------|
//! | admin    | read, write, delete, admin   |
//! | writer   | read, write                  |
//! | readonly | read                         |
//!
//! # Key Extraction
//!
//! Keys are accepted from, in priority order:
//! 1. `Authorization: Bearer <key>`
//! 2. `X-API-Key: <key>`
//! 3. The `api_key` query parameter (deprecated; logged on use because
//!    query strings end up in access logs and referrers)
//!
//! # Timing
//!
//! Key lookup scans the whole table with constant-time comparison and no
//! early exit, so response timing does not reveal whether a presented
//! key shares a prefix with a real one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppError;

/// Length in bytes of generated API keys, before base64 encoding.
const GENERATED_KEY_BYTES: usize = 32;

// =============================================================================
// Permissions and Credentials
// =============================================================================

/// A single grantable capability. Gates require exactly one of these;
/// holding `Admin` does not imply holding `Delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    Delete,
    Admin,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

/// What a valid API key grants.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Role label, for logging and the auth context.
    pub role: String,
    /// The exact set of capabilities this key holds.
    pub permissions: HashSet<Permission>,
}

/// The static API key table.
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
}

impl CredentialStore {
    /// Build the table from the configured role keys.
    pub fn from_config(config: &Config) -> Self {
        let mut credentials = HashMap::new();
        credentials.insert(
            config.admin_api_key.clone(),
            Credential {
                role: "admin".to_string(),
                permissions: HashSet::from([
                    Permission::Read,
                    Permission::Write,
                    Permission::Delete,
                    Permission::Admin,
                ]),
            },
        );
        credentials.insert(
            config.writer_api_key.clone(),
            Credential {
                role: "writer".to_string(),
                permissions: HashSet::from([Permission::Read, Permission::Write]),
            },
        );
        credentials.insert(
            config.readonly_api_key.clone(),
            Credential {
                role: "readonly".to_string(),
                permissions: HashSet::from([Permission::Read]),
            },
        );
        Self { credentials }
    }

    /// Look up a presented key.
    ///
    /// Scans every entry with constant-time comparison and no early
    /// exit, so lookup time is independent of which (if any) entry
    /// matches.
    pub fn authenticate(&self, presented: &str) -> Option<&Credential> {
        let presented = presented.as_bytes();
        let mut matched = None;
        for (token, credential) in &self.credentials {
            if bool::from(token.as_bytes().ct_eq(presented)) {
                matched = Some(credential);
            }
        }
        matched
    }

    /// Generate a fresh random API key: 32 bytes of OS entropy, base64
    /// URL-safe encoded.
    ///
    /// The key is returned to the caller only; it is not added to the
    /// table. Activating it means deploying it through configuration,
    /// which keeps the running credential set equal to the configured
    /// one.
    pub fn issue_key(&self) -> String {
        let mut bytes = [0u8; GENERATED_KEY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Authentication outcome attached to the request as an extension.
///
/// Handlers can read this to vary their response by role; optional-auth
/// routes see [`AuthContext::Anonymous`] when no key was presented.
#[derive(Debug, Clone)]
pub enum AuthContext {
    Anonymous,
    Authenticated {
        role: String,
        permissions: HashSet<Permission>,
    },
}

impl AuthContext {
    /// Role label for logging, `"anonymous"` when unauthenticated.
    pub fn role(&self) -> &str {
        match self {
            AuthContext::Anonymous => "anonymous",
            AuthContext::Authenticated { role, .. } => role,
        }
    }
}

// =============================================================================
// Key Extraction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
    BearerHeader,
    ApiKeyHeader,
    QueryParam,
}

/// Pull the presented API key out of a request, if any.
fn extract_api_key<B>(req: &Request<B>) -> Option<(String, KeySource)> {
    if let Some(authorization) = req.headers().get("authorization")
        && let Ok(value) = authorization.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some((token.to_string(), KeySource::BearerHeader));
        }
    }

    if let Some(header) = req.headers().get("x-api-key")
        && let Ok(value) = header.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return Some((value.to_string(), KeySource::ApiKeyHeader));
        }
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("api_key=")
                && !value.is_empty()
            {
                return Some((value.to_string(), KeySource::QueryParam));
            }
        }
    }

    None
}

// =============================================================================
// Tower Layer
// =============================================================================

/// Whether a route requires a permission or merely records identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// The request must carry a key holding this permission.
    Required(Permission),
    /// Anonymous access is fine; a valid key attaches its identity, and
    /// an invalid key is treated the same as no key at all.
    Optional,
}

/// API key authentication layer.
#[derive(Clone)]
pub struct ApiKeyAuthLayer {
    store: Arc<CredentialStore>,
    mode: AuthMode,
}

impl ApiKeyAuthLayer {
    /// Gate requiring `permission`.
    pub fn require(store: Arc<CredentialStore>, permission: Permission) -> Self {
        Self {
            store,
            mode: AuthMode::Required(permission),
        }
    }

    /// Identity-only layer for public routes.
    pub fn optional(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            mode: AuthMode::Optional,
        }
    }
}

impl<S> Layer<S> for ApiKeyAuthLayer {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            store: self.store.clone(),
            mode: self.mode,
        }
    }
}

/// Authentication service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    store: Arc<CredentialStore>,
    mode: AuthMode,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let store = self.store.clone();
        let mode = self.mode;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let presented = extract_api_key(&req);
            let path = req.uri().path().to_string();
            let client_ip = super::ip::resolve_client_ip(&req);

            let failure = match presented {
                None => match mode {
                    AuthMode::Optional => {
                        req.extensions_mut().insert(AuthContext::Anonymous);
                        None
                    }
                    AuthMode::Required(_) => {
                        crate::metrics::record_auth_failure("missing_key");
                        warn!(
                            client_ip = %client_ip,
                            role = "none",
                            path = %path,
                            "Rejected request without API key"
                        );
                        Some(AppError::Unauthenticated("API key required".to_string()))
                    }
                },
                Some((token, source)) => {
                    if source == KeySource::QueryParam {
                        warn!(
                            path = %path,
                            "API key passed as query parameter; this is deprecated, use the Authorization or X-API-Key header"
                        );
                    }

                    match store.authenticate(&token) {
                        None => match mode {
                            // Optional routes treat an invalid key like a
                            // missing one
                            AuthMode::Optional => {
                                req.extensions_mut().insert(AuthContext::Anonymous);
                                None
                            }
                            AuthMode::Required(_) => {
                                crate::metrics::record_auth_failure("invalid_key");
                                warn!(
                                    client_ip = %client_ip,
                                    role = "none",
                                    path = %path,
                                    "Rejected unrecognized API key"
                                );
                                Some(AppError::Unauthenticated("Invalid API key".to_string()))
                            }
                        },
                        Some(credential) => {
                            let missing = match mode {
                                AuthMode::Required(permission)
                                    if !credential.permissions.contains(&permission) =>
                                {
                                    Some(permission)
                                }
                                _ => None,
                            };

                            match missing {
                                Some(permission) => {
                                    crate::metrics::record_auth_failure("insufficient_permissions");
                                    warn!(
                                        client_ip = %client_ip,
                                        role = %credential.role,
                                        required = %permission,
                                        path = %path,
                                        "Permission denied"
                                    );
                                    Some(AppError::Unauthorized(format!(
                                        "This operation requires the '{permission}' permission"
                                    )))
                                }
                                None => {
                                    debug!(role = %credential.role, path = %path, "Authenticated");
                                    crate::metrics::record_auth_success();
                                    req.extensions_mut().insert(AuthContext::Authenticated {
                                        role: credential.role.clone(),
                                        permissions: credential.permissions.clone(),
                                    });
                                    None
                                }
                            }
                        }
                    }
                }
            };

            match failure {
                Some(error) => Ok(error.into_response()),
                None => inner.call(req).await,
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::from_config(&Config::default())
    }

    #[test]
    fn test_authenticate_valid_keys() {
        let store = store();

        let admin = store.authenticate("admin_key_123").unwrap();
        assert_eq!(admin.role, "admin");
        assert!(admin.permissions.contains(&Permission::Admin));
        assert!(admin.permissions.contains(&Permission::Delete));

        let writer = store.authenticate("writer_key_789").unwrap();
        assert_eq!(writer.role, "writer");
        assert!(writer.permissions.contains(&Permission::Write));
        assert!(!writer.permissions.contains(&Permission::Delete));

        let readonly = store.authenticate("readonly_key_456").unwrap();
        assert_eq!(readonly.role, "readonly");
        assert_eq!(readonly.permissions, HashSet::from([Permission::Read]));
    }

    #[test]
    fn test_authenticate_rejects_unknown_key() {
        assert!(store().authenticate("nope").is_none());
        assert!(store().authenticate("").is_none());
        // Prefix of a real key must not match
        assert!(store().authenticate("admin_key_12").is_none());
    }

    #[test]
    fn test_permissions_are_not_hierarchical() {
        let store = store();
        let writer = store.authenticate("writer_key_789").unwrap();
        // Writer holds write but that implies nothing about admin
        assert!(!writer.permissions.contains(&Permission::Admin));
    }

    #[test]
    fn test_issue_key_shape() {
        let store = store();
        let key = store.issue_key();

        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(key.len(), 43);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_issue_key_is_random() {
        let store = store();
        assert_ne!(store.issue_key(), store.issue_key());
    }

    #[test]
    fn test_issued_key_is_not_live() {
        let store = store();
        let key = store.issue_key();
        assert!(store.authenticate(&key).is_none());
    }

    #[test]
    fn test_extract_bearer_header() {
        let req = Request::builder()
            .header("authorization", "Bearer secret_token")
            .body(Body::empty())
            .unwrap();

        let (key, source) = extract_api_key(&req).unwrap();
        assert_eq!(key, "secret_token");
        assert_eq!(source, KeySource::BearerHeader);
    }

    #[test]
    fn test_extract_api_key_header() {
        let req = Request::builder()
            .header("x-api-key", "secret_token")
            .body(Body::empty())
            .unwrap();

        let (key, source) = extract_api_key(&req).unwrap();
        assert_eq!(key, "secret_token");
        assert_eq!(source, KeySource::ApiKeyHeader);
    }

    #[test]
    fn test_extract_query_param() {
        let req = Request::builder()
            .uri("/api/games?page=2&api_key=secret_token")
            .body(Body::empty())
            .unwrap();

        let (key, source) = extract_api_key(&req).unwrap();
        assert_eq!(key, "secret_token");
        assert_eq!(source, KeySource::QueryParam);
    }

    #[test]
    fn test_extract_priority_bearer_first() {
        let req = Request::builder()
            .uri("/api/games?api_key=from_query")
            .header("authorization", "Bearer from_bearer")
            .header("x-api-key", "from_header")
            .body(Body::empty())
            .unwrap();

        let (key, _) = extract_api_key(&req).unwrap();
        assert_eq!(key, "from_bearer");
    }

    #[test]
    fn test_extract_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(extract_api_key(&req).is_none());

        // Non-Bearer authorization schemes are ignored
        let req = Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert!(extract_api_key(&req).is_none());
    }

    /// Collects formatted log lines so tests can assert on their content.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> LogCapture {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_auth_failures_are_logged_with_client_ip() {
        use axum::Router;
        use axum::routing::post;
        use tower::ServiceExt;
        use tracing::instrument::WithSubscriber;

        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();

        let app = Router::new()
            .route("/guarded", post(|| async { "ok" }))
            .layer(ApiKeyAuthLayer::require(
                Arc::new(store()),
                Permission::Write,
            ));

        // Missing key
        let request = Request::builder()
            .method("POST")
            .uri("/guarded")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        app.clone()
            .oneshot(request)
            .with_subscriber(subscriber)
            .await
            .unwrap();

        let logs = capture.contents();
        assert!(logs.contains("203.0.113.9"), "missing-key log: {logs}");
        assert!(logs.contains("/guarded"), "missing-key log: {logs}");

        // Invalid key
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let request = Request::builder()
            .method("POST")
            .uri("/guarded")
            .header("x-api-key", "bogus")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request)
            .with_subscriber(subscriber)
            .await
            .unwrap();

        let logs = capture.contents();
        assert!(logs.contains("198.51.100.4"), "invalid-key log: {logs}");
        assert!(logs.contains("/guarded"), "invalid-key log: {logs}");
    }

    #[test]
    fn test_auth_context_role() {
        assert_eq!(AuthContext::Anonymous.role(), "anonymous");
        let ctx = AuthContext::Authenticated {
            role: "writer".to_string(),
            permissions: HashSet::from([Permission::Read, Permission::Write]),
        };
        assert_eq!(ctx.role(), "writer");
    }
}
