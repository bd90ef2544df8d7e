//! SQLite persistence for the procurement workflow: connection pool setup,
//! embedded migrations, repositories, and deterministic seed fixtures.

pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::SeedDataset;
pub use repositories::{
    InMemoryRequestRepository, InMemoryUserRepository, RepositoryError, RequestRepository,
    SqlRequestRepository, SqlUserRepository, UserRepository,
};
