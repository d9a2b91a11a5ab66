//! Extractors that keep rejections inside the response envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use tracing::debug;

use crate::error::AppError;

/// `axum::Json` with rejections mapped into [`AppError`].
///
/// The validation layer catches malformed JSON, but a body can still be
/// refused here: a missing `Content-Type: application/json` header, or a
/// field whose type does not match the target struct. Axum's stock
/// rejections for those answer in plain text; this wrapper converts them
/// to a 400 with the standard envelope so every response on the API
/// keeps the same shape.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let detail = rejection.body_text();
                debug!(%detail, "Rejected request body at extraction");
                Err(AppError::BadRequest(detail))
            }
        }
    }
}
