//! Movie and actor catalog.
//!
//! This module handles:
//! - Entity types and join rows
//! - Movie list query construction (sorting, filtering)
//! - Flattening join rows into nested movies
//! - The [`Catalog`] storage trait with PostgreSQL and in-memory backends

pub mod aggregate;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod schema;
pub mod store;
pub mod types;

pub use aggregate::aggregate_movies;
pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;
pub use query::{build_movie_list, MovieQuery, SortField, SortOrder};
pub use store::Catalog;
pub use types::{Actor, Movie, MovieActor, MovieActorRow};
