//! Administrative handlers. All routes here sit behind the admin
//! permission gate and a tight strict rate limit.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use tracing::info;

use crate::models::GeneratedKey;
use crate::response::ApiResponse;
use crate::state::AppState;

/// `POST /api/admin/keys` - mint a fresh API key.
///
/// The key is returned once and never logged or stored; activating it
/// means deploying it through the role-key configuration.
pub async fn generate_key(State(state): State<AppState>) -> Response {
    let api_key = state.credentials.issue_key();
    info!("Admin generated a new API key");

    let generated = GeneratedKey {
        api_key,
        note: "Add this key to the service configuration to activate it; it is not live yet"
            .to_string(),
    };

    ApiResponse::ok("API key generated")
        .with_data(&generated)
        .into_response_with_status(StatusCode::CREATED)
}
