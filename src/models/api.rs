use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to create a new game.
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    /// Game name (must be unique)
    pub name: String,
    /// Genre/category label
    pub category: String,
    /// Price, must be within [0, 9999.99]
    pub price: Decimal,
    /// Rating, must be within [0, 10]
    pub rating: f64,
    /// Optional developer link
    #[serde(default)]
    pub developer_id: Option<u32>,
}

/// Request to update an existing game. All fields optional; absent
/// fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGameRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub rating: Option<f64>,
    pub developer_id: Option<u32>,
}

impl UpdateGameRequest {
    /// True when the request carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.rating.is_none()
            && self.developer_id.is_none()
    }
}

/// Request to create a new developer.
#[derive(Debug, Deserialize)]
pub struct CreateDeveloperRequest {
    /// Developer name (must be unique)
    pub name: String,
    /// Country of origin
    pub country: String,
    /// Founding year, if known
    #[serde(default)]
    pub founded_year: Option<i32>,
}

/// Request to update an existing developer.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeveloperRequest {
    pub name: Option<String>,
    pub country: Option<String>,
    pub founded_year: Option<i32>,
}

impl UpdateDeveloperRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.country.is_none() && self.founded_year.is_none()
    }
}

/// Query-string filters for the game list endpoint.
///
/// `search` matches against name, category and developer name;
/// `category` is a substring match on the category alone. Price and
/// rating bounds are inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct GameFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub developer_id: Option<u32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<f64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Embedded developer summary attached to game responses.
#[derive(Debug, Clone, Serialize)]
pub struct DeveloperSummary {
    pub id: u32,
    pub name: String,
    pub country: String,
}

/// A game as returned by the API, with the developer denormalized in.
#[derive(Debug, Serialize)]
pub struct GameDetails {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub rating: f64,
    pub developer_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer: Option<DeveloperSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Paginated game list with pagination metadata.
#[derive(Debug, Serialize)]
pub struct PagedGames {
    pub items: Vec<GameDetails>,
    /// Total matches before pagination
    pub total: usize,
    /// Total pages at the requested page size
    pub pages: usize,
    pub current_page: u32,
    pub per_page: u32,
}

/// Aggregate statistics over the game catalog.
#[derive(Debug, Serialize)]
pub struct GameStatistics {
    pub total_games: usize,
    pub unique_categories: usize,
    pub average_price: Decimal,
    pub average_rating: f64,
}

/// Health check response payload.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Service statistics payload for the `/stats` endpoint.
#[derive(Debug, Serialize)]
pub struct ServiceStats {
    pub uptime_seconds: u64,
    pub games_count: usize,
    pub developers_count: usize,
    /// Distinct client IPs currently tracked by the rate limiter
    pub tracked_clients: usize,
}

/// Payload returned by the admin key-generation endpoint.
#[derive(Debug, Serialize)]
pub struct GeneratedKey {
    pub api_key: String,
    pub note: String,
}

/// Self-describing API index served at `/api/`.
#[derive(Debug, Serialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: serde_json::Value,
}
