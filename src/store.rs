//! In-memory catalog storage.
//!
//! Games and developers live in `RwLock`-guarded maps with atomic ID
//! counters. Business rules enforced here, independent of the request
//! validation layer:
//!
//! - game and developer names are unique, case-insensitively
//! - a game's `developer_id` must reference an existing developer
//! - price stays within [0, 9999.99], rating within [0, 10]
//! - deleting a developer unlinks their games rather than deleting them
//!
//! All mutations stamp `updated_at`; reads return denormalized
//! [`GameDetails`] with the developer summary embedded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateDeveloperRequest, CreateGameRequest, Developer, DeveloperSummary, Game, GameDetails,
    GameFilter, GameStatistics, PagedGames, UpdateDeveloperRequest, UpdateGameRequest,
};

/// Maximum game name length.
const MAX_NAME_LEN: usize = 100;
/// Maximum category label length.
const MAX_CATEGORY_LEN: usize = 50;
/// Page size bounds for game listings.
const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

/// Thread-safe in-memory store for the game catalog.
pub struct CatalogStore {
    games: RwLock<HashMap<u32, Game>>,
    developers: RwLock<HashMap<u32, Developer>>,
    next_game_id: AtomicU32,
    next_developer_id: AtomicU32,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            developers: RwLock::new(HashMap::new()),
            next_game_id: AtomicU32::new(1),
            next_developer_id: AtomicU32::new(1),
        }
    }

    /// Populate the store with a small demo catalog. Used on startup so
    /// a fresh instance answers list queries with something real.
    pub async fn seed_sample_data(&self) {
        let seed_developers = [
            ("Nintendo", "Japan", Some(1889)),
            ("Valve", "United States", Some(1996)),
            ("CD Projekt Red", "Poland", Some(2002)),
        ];

        let mut developer_ids = Vec::new();
        for (name, country, founded_year) in seed_developers {
            let request = CreateDeveloperRequest {
                name: name.to_string(),
                country: country.to_string(),
                founded_year,
            };
            if let Ok(developer) = self.create_developer(request).await {
                developer_ids.push(developer.id);
            }
        }

        let seed_games = [
            ("The Legend of Zelda: Breath of the Wild", "Adventure", 59.99, 9.5, 0usize),
            ("Half-Life 2", "Shooter", 9.99, 9.2, 1),
            ("Portal 2", "Puzzle", 9.99, 9.4, 1),
            ("The Witcher 3: Wild Hunt", "RPG", 39.99, 9.7, 2),
            ("Cyberpunk 2077", "RPG", 59.99, 8.1, 2),
        ];

        for (name, category, price, rating, dev_index) in seed_games {
            let request = CreateGameRequest {
                name: name.to_string(),
                category: category.to_string(),
                price: Decimal::from_f64(price).unwrap_or_default(),
                rating,
                developer_id: developer_ids.get(dev_index).copied(),
            };
            let _ = self.create_game(request).await;
        }

        info!(
            games = self.games_count().await,
            developers = self.developers_count().await,
            "Seeded sample catalog"
        );
    }

    // =========================================================================
    // Games
    // =========================================================================

    /// Create a game. Fails on duplicate name, unknown developer, or
    /// out-of-range price/rating.
    pub async fn create_game(&self, request: CreateGameRequest) -> AppResult<GameDetails> {
        validate_name(&request.name)?;
        validate_category(&request.category)?;
        validate_price(request.price)?;
        validate_rating(request.rating)?;

        let developers = self.developers.read().await;
        if let Some(developer_id) = request.developer_id
            && !developers.contains_key(&developer_id)
        {
            return Err(AppError::BadRequest(format!(
                "Developer {developer_id} does not exist"
            )));
        }

        let mut games = self.games.write().await;
        if games
            .values()
            .any(|g| g.name.eq_ignore_ascii_case(&request.name))
        {
            return Err(AppError::BadRequest(format!(
                "A game named '{}' already exists",
                request.name
            )));
        }

        let now = Utc::now();
        let game = Game {
            id: self.next_game_id.fetch_add(1, Ordering::Relaxed),
            name: request.name,
            category: request.category,
            price: request.price,
            rating: request.rating,
            developer_id: request.developer_id,
            created_at: now,
            updated_at: now,
        };

        let details = details_for(&game, &developers);
        games.insert(game.id, game);
        Ok(details)
    }

    /// Fetch one game with its developer embedded.
    pub async fn get_game(&self, id: u32) -> AppResult<GameDetails> {
        // Lock order is developers before games, everywhere
        let developers = self.developers.read().await;
        let games = self.games.read().await;
        games
            .get(&id)
            .map(|game| details_for(game, &developers))
            .ok_or(AppError::NotFound)
    }

    /// List games matching `filter`, paginated.
    pub async fn list_games(&self, filter: &GameFilter) -> PagedGames {
        let developers = self.developers.read().await;
        let games = self.games.read().await;

        let mut matches: Vec<&Game> = games
            .values()
            .filter(|game| matches_filter(game, filter, &developers))
            .collect();
        matches.sort_by_key(|game| game.id);

        let total = matches.len();
        let per_page = filter
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let pages = total.div_ceil(per_page as usize).max(1);
        let current_page = filter.page.unwrap_or(1).max(1);

        let start = (current_page as usize - 1).saturating_mul(per_page as usize);
        let items = matches
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .map(|game| details_for(game, &developers))
            .collect();

        PagedGames {
            items,
            total,
            pages,
            current_page,
            per_page,
        }
    }

    /// Apply a partial update. An update carrying no fields is an error.
    pub async fn update_game(&self, id: u32, request: UpdateGameRequest) -> AppResult<GameDetails> {
        if request.is_empty() {
            return Err(AppError::BadRequest(
                "Update request contains no fields".to_string(),
            ));
        }

        if let Some(name) = &request.name {
            validate_name(name)?;
        }
        if let Some(category) = &request.category {
            validate_category(category)?;
        }
        if let Some(price) = request.price {
            validate_price(price)?;
        }
        if let Some(rating) = request.rating {
            validate_rating(rating)?;
        }

        let developers = self.developers.read().await;
        if let Some(developer_id) = request.developer_id
            && !developers.contains_key(&developer_id)
        {
            return Err(AppError::BadRequest(format!(
                "Developer {developer_id} does not exist"
            )));
        }

        let mut games = self.games.write().await;

        if let Some(name) = &request.name
            && games
                .values()
                .any(|g| g.id != id && g.name.eq_ignore_ascii_case(name))
        {
            return Err(AppError::BadRequest(format!(
                "A game named '{name}' already exists"
            )));
        }

        let game = games.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(name) = request.name {
            game.name = name;
        }
        if let Some(category) = request.category {
            game.category = category;
        }
        if let Some(price) = request.price {
            game.price = price;
        }
        if let Some(rating) = request.rating {
            game.rating = rating;
        }
        if let Some(developer_id) = request.developer_id {
            game.developer_id = Some(developer_id);
        }
        game.updated_at = Utc::now();

        Ok(details_for(game, &developers))
    }

    /// Remove a game.
    pub async fn delete_game(&self, id: u32) -> AppResult<()> {
        let mut games = self.games.write().await;
        games.remove(&id).map(|_| ()).ok_or(AppError::NotFound)
    }

    /// Distinct category labels, sorted.
    pub async fn categories(&self) -> Vec<String> {
        let games = self.games.read().await;
        let mut categories: Vec<String> = games.values().map(|g| g.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Aggregate statistics over the whole catalog.
    pub async fn statistics(&self) -> GameStatistics {
        let games = self.games.read().await;
        let total_games = games.len();

        let (average_price, average_rating) = if total_games == 0 {
            (Decimal::ZERO, 0.0)
        } else {
            let price_sum: Decimal = games.values().map(|g| g.price).sum();
            let rating_sum: f64 = games.values().map(|g| g.rating).sum();
            let count = Decimal::from(total_games as u64);
            // Fixed two-decimal scale so the price serializes as "15.00",
            // not "15"
            let mut average_price = (price_sum / count).round_dp(2);
            average_price.rescale(2);
            (average_price, rating_sum / total_games as f64)
        };

        let unique_categories = {
            let mut categories: Vec<&str> =
                games.values().map(|g| g.category.as_str()).collect();
            categories.sort_unstable();
            categories.dedup();
            categories.len()
        };

        GameStatistics {
            total_games,
            unique_categories,
            average_price,
            average_rating,
        }
    }

    /// Number of games in the catalog.
    pub async fn games_count(&self) -> usize {
        self.games.read().await.len()
    }

    // =========================================================================
    // Developers
    // =========================================================================

    /// Create a developer. Fails on duplicate name.
    pub async fn create_developer(&self, request: CreateDeveloperRequest) -> AppResult<Developer> {
        validate_name(&request.name)?;

        let mut developers = self.developers.write().await;
        if developers
            .values()
            .any(|d| d.name.eq_ignore_ascii_case(&request.name))
        {
            return Err(AppError::BadRequest(format!(
                "A developer named '{}' already exists",
                request.name
            )));
        }

        let developer = Developer {
            id: self.next_developer_id.fetch_add(1, Ordering::Relaxed),
            name: request.name,
            country: request.country,
            founded_year: request.founded_year,
            created_at: Utc::now(),
        };
        developers.insert(developer.id, developer.clone());
        Ok(developer)
    }

    /// Fetch one developer.
    pub async fn get_developer(&self, id: u32) -> AppResult<Developer> {
        self.developers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    /// All developers, sorted by ID.
    pub async fn list_developers(&self) -> Vec<Developer> {
        let developers = self.developers.read().await;
        let mut all: Vec<Developer> = developers.values().cloned().collect();
        all.sort_by_key(|d| d.id);
        all
    }

    /// Apply a partial update to a developer.
    pub async fn update_developer(
        &self,
        id: u32,
        request: UpdateDeveloperRequest,
    ) -> AppResult<Developer> {
        if request.is_empty() {
            return Err(AppError::BadRequest(
                "Update request contains no fields".to_string(),
            ));
        }

        if let Some(name) = &request.name {
            validate_name(name)?;
        }

        let mut developers = self.developers.write().await;

        if let Some(name) = &request.name
            && developers
                .values()
                .any(|d| d.id != id && d.name.eq_ignore_ascii_case(name))
        {
            return Err(AppError::BadRequest(format!(
                "A developer named '{name}' already exists"
            )));
        }

        let developer = developers.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(name) = request.name {
            developer.name = name;
        }
        if let Some(country) = request.country {
            developer.country = country;
        }
        if let Some(founded_year) = request.founded_year {
            developer.founded_year = Some(founded_year);
        }

        Ok(developer.clone())
    }

    /// Remove a developer and unlink their games.
    pub async fn delete_developer(&self, id: u32) -> AppResult<()> {
        let mut developers = self.developers.write().await;
        developers.remove(&id).ok_or(AppError::NotFound)?;

        // Games survive their developer; they just lose the link
        let mut games = self.games.write().await;
        for game in games.values_mut() {
            if game.developer_id == Some(id) {
                game.developer_id = None;
                game.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    /// Games linked to one developer.
    pub async fn games_by_developer(&self, developer_id: u32) -> AppResult<Vec<GameDetails>> {
        let developers = self.developers.read().await;
        if !developers.contains_key(&developer_id) {
            return Err(AppError::NotFound);
        }

        let games = self.games.read().await;
        let mut linked: Vec<GameDetails> = games
            .values()
            .filter(|g| g.developer_id == Some(developer_id))
            .map(|g| details_for(g, &developers))
            .collect();
        linked.sort_by_key(|g| g.id);
        Ok(linked)
    }

    /// Number of developers in the catalog.
    pub async fn developers_count(&self) -> usize {
        self.developers.read().await.len()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn details_for(game: &Game, developers: &HashMap<u32, Developer>) -> GameDetails {
    let developer = game
        .developer_id
        .and_then(|id| developers.get(&id))
        .map(|d| DeveloperSummary {
            id: d.id,
            name: d.name.clone(),
            country: d.country.clone(),
        });

    GameDetails {
        id: game.id,
        name: game.name.clone(),
        category: game.category.clone(),
        price: game.price,
        rating: game.rating,
        developer_id: game.developer_id,
        developer,
        created_at: game.created_at,
        updated_at: game.updated_at,
    }
}

fn matches_filter(game: &Game, filter: &GameFilter, developers: &HashMap<u32, Developer>) -> bool {
    if let Some(category) = &filter.category
        && !game
            .category
            .to_lowercase()
            .contains(&category.to_lowercase())
    {
        return false;
    }

    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let developer_name = game
            .developer_id
            .and_then(|id| developers.get(&id))
            .map(|d| d.name.to_lowercase())
            .unwrap_or_default();
        let hit = game.name.to_lowercase().contains(&needle)
            || game.category.to_lowercase().contains(&needle)
            || developer_name.contains(&needle);
        if !hit {
            return false;
        }
    }

    if let Some(developer_id) = filter.developer_id
        && game.developer_id != Some(developer_id)
    {
        return false;
    }

    if let Some(min_price) = filter.min_price
        && game.price < min_price
    {
        return false;
    }

    if let Some(max_price) = filter.max_price
        && game.price > max_price
    {
        return false;
    }

    if let Some(min_rating) = filter.min_rating
        && game.rating < min_rating
    {
        return false;
    }

    true
}

fn validate_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> AppResult<()> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Category must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_CATEGORY_LEN {
        return Err(AppError::BadRequest(format!(
            "Category cannot exceed {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    let max = Decimal::new(999_999, 2); // 9999.99
    if price < Decimal::ZERO || price > max {
        return Err(AppError::BadRequest(
            "Price must be between 0 and 9999.99".to_string(),
        ));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> AppResult<()> {
    if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 0 and 10".to_string(),
        ));
    }
    Ok(())
}
