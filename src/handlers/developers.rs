//! Developer CRUD handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use tracing::info;

use crate::error::AppResult;
use crate::extract::Json;
use crate::models::{CreateDeveloperRequest, UpdateDeveloperRequest};
use crate::response::ApiResponse;
use crate::state::AppState;

/// `GET /api/developers`.
pub async fn list_developers(State(state): State<AppState>) -> Response {
    let developers = state.store.list_developers().await;
    let count = developers.len();

    ApiResponse::ok("Developers retrieved")
        .with_data(&developers)
        .with_count(count)
        .into_response_with_status(StatusCode::OK)
}

/// `GET /api/developers/{id}`.
pub async fn get_developer(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Response> {
    let developer = state.store.get_developer(id).await?;

    Ok(ApiResponse::ok("Developer retrieved")
        .with_data(&developer)
        .into_response_with_status(StatusCode::OK))
}

/// `GET /api/developers/{id}/games` - the developer's catalog.
pub async fn developer_games(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Response> {
    let games = state.store.games_by_developer(id).await?;
    let count = games.len();

    Ok(ApiResponse::ok("Developer games retrieved")
        .with_data(&games)
        .with_count(count)
        .into_response_with_status(StatusCode::OK))
}

/// `POST /api/developers` - requires write permission.
pub async fn create_developer(
    State(state): State<AppState>,
    Json(request): Json<CreateDeveloperRequest>,
) -> AppResult<Response> {
    let developer = state.store.create_developer(request).await?;
    info!(developer_id = developer.id, name = %developer.name, "Developer created");

    Ok(ApiResponse::ok("Developer created")
        .with_data(&developer)
        .into_response_with_status(StatusCode::CREATED))
}

/// `PUT /api/developers/{id}` - requires write permission.
pub async fn update_developer(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<UpdateDeveloperRequest>,
) -> AppResult<Response> {
    let developer = state.store.update_developer(id, request).await?;
    info!(developer_id = developer.id, "Developer updated");

    Ok(ApiResponse::ok("Developer updated")
        .with_data(&developer)
        .into_response_with_status(StatusCode::OK))
}

/// `DELETE /api/developers/{id}` - requires delete permission. Their
/// games stay in the catalog, unlinked.
pub async fn delete_developer(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Response> {
    state.store.delete_developer(id).await?;
    info!(developer_id = id, "Developer deleted, games unlinked");

    Ok(ApiResponse::ok("Developer deleted").into_response_with_status(StatusCode::OK))
}
