//! Game catalog CRUD handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use tracing::info;

use crate::error::AppResult;
use crate::extract::Json;
use crate::models::{CreateGameRequest, GameFilter, UpdateGameRequest};
use crate::response::ApiResponse;
use crate::state::AppState;

/// `GET /api/games` - filtered, paginated listing.
pub async fn list_games(
    State(state): State<AppState>,
    Query(filter): Query<GameFilter>,
) -> Response {
    let page = state.store.list_games(&filter).await;
    let returned = page.items.len();

    ApiResponse::ok("Games retrieved")
        .with_data(&page)
        .with_count(returned)
        .into_response_with_status(StatusCode::OK)
}

/// `GET /api/games/{id}`.
pub async fn get_game(State(state): State<AppState>, Path(id): Path<u32>) -> AppResult<Response> {
    let game = state.store.get_game(id).await?;

    Ok(ApiResponse::ok("Game retrieved")
        .with_data(&game)
        .into_response_with_status(StatusCode::OK))
}

/// `POST /api/games` - requires write permission.
pub async fn create_game(
    State(state): State<AppState>,
    Json(request): Json<CreateGameRequest>,
) -> AppResult<Response> {
    let game = state.store.create_game(request).await?;
    info!(game_id = game.id, name = %game.name, "Game created");

    Ok(ApiResponse::ok("Game created")
        .with_data(&game)
        .into_response_with_status(StatusCode::CREATED))
}

/// `PUT /api/games/{id}` - requires write permission.
pub async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<UpdateGameRequest>,
) -> AppResult<Response> {
    let game = state.store.update_game(id, request).await?;
    info!(game_id = game.id, "Game updated");

    Ok(ApiResponse::ok("Game updated")
        .with_data(&game)
        .into_response_with_status(StatusCode::OK))
}

/// `DELETE /api/games/{id}` - requires delete permission.
pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Response> {
    state.store.delete_game(id).await?;
    info!(game_id = id, "Game deleted");

    Ok(ApiResponse::ok("Game deleted").into_response_with_status(StatusCode::OK))
}

/// `GET /api/games/categories` - distinct category labels.
pub async fn categories(State(state): State<AppState>) -> Response {
    let categories = state.store.categories().await;
    let count = categories.len();

    ApiResponse::ok("Categories retrieved")
        .with_data(&categories)
        .with_count(count)
        .into_response_with_status(StatusCode::OK)
}

/// `GET /api/games/statistics` - catalog aggregates. Expensive enough
/// to sit behind the per-hour budget.
pub async fn statistics(State(state): State<AppState>) -> Response {
    let stats = state.store.statistics().await;

    ApiResponse::ok("Statistics computed")
        .with_data(&stats)
        .into_response_with_status(StatusCode::OK)
}
