//! Catalog records held by the in-memory store.
//!
//! These are the persisted shapes; the API layer exposes them through the
//! DTOs in [`super::api`]. All records carry audit timestamps set by the
//! store on create/update.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A videogame entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// Store-assigned identifier
    pub id: u32,
    /// Unique game name (max 100 characters)
    pub name: String,
    /// Genre/category label (max 50 characters)
    pub category: String,
    /// Price in the catalog currency; decimal to avoid float drift
    pub price: Decimal,
    /// Review rating in [0, 10]
    pub rating: f64,
    /// Owning developer, if linked
    pub developer_id: Option<u32>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

/// A game developer/publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    /// Store-assigned identifier
    pub id: u32,
    /// Unique developer name
    pub name: String,
    /// Country of origin
    pub country: String,
    /// Founding year, if known
    pub founded_year: Option<i32>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}
