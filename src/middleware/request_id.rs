//! Request ID correlation middleware.
//!
//! Every request gets an `X-Request-Id`: the client's own value when it
//! supplies a plausible one, a fresh UUIDv4 otherwise. The ID rides the
//! request as an extension for handlers and logging, and is echoed on
//! the response so clients can correlate.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Span, debug};
use uuid::Uuid;

/// Correlation header name.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied ID we accept verbatim. Anything longer (or
/// containing non-printable bytes) is replaced with a generated UUID.
const MAX_CLIENT_ID_LEN: usize = 128;

/// Request ID attached to the request as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Request ID layer for the Tower middleware stack.
#[derive(Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
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
        let request_id = accept_or_generate(&req);
        req.extensions_mut().insert(RequestId(request_id.clone()));

        Span::current().record("request_id", request_id.as_str());
        debug!(request_id = %request_id, method = %req.method(), path = %req.uri().path(), "Processing request");

        let method = req.method().to_string();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            crate::metrics::record_request(&method, response.status().as_u16());
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

/// Take the client's ID when it looks sane, otherwise mint a UUIDv4.
fn accept_or_generate<B>(req: &Request<B>) -> String {
    if let Some(header) = req.headers().get(REQUEST_ID_HEADER)
        && let Ok(value) = header.to_str()
        && !value.is_empty()
        && value.len() <= MAX_CLIENT_ID_LEN
        && value.chars().all(|c| c.is_ascii_graphic())
    {
        return value.to_string();
    }

    Uuid::new_v4().to_string()
}
