//! Domain records and API data transfer objects.

pub mod api;
pub mod catalog;

pub use api::{
    ApiInfo, CreateDeveloperRequest, CreateGameRequest, DeveloperSummary, GameDetails, GameFilter,
    GameStatistics, GeneratedKey, HealthStatus, PagedGames, ServiceStats, UpdateDeveloperRequest,
    UpdateGameRequest,
};
pub use catalog::{Developer, Game};
