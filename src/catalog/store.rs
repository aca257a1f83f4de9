//! Data-access seam between HTTP handlers and storage.

use async_trait::async_trait;

use super::query::MovieQuery;
use super::types::{Actor, Movie};
use crate::error::StoreError;

/// Storage operations for actors, movies and the cast join table.
///
/// Implementations must apply multi-statement writes atomically: a movie and
/// its cast rows are either all written or not at all.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// All actors, ordered by id.
    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError>;

    /// Insert an actor. `actor.id` is ignored; the stored row is returned.
    async fn create_actor(&self, actor: &Actor) -> Result<Actor, StoreError>;

    /// Overwrite the scalar fields of an existing actor.
    async fn update_actor(&self, actor: &Actor) -> Result<Actor, StoreError>;

    /// Delete an actor and every cast entry referencing it.
    async fn delete_actor(&self, id: i32) -> Result<(), StoreError>;

    /// Movies with their casts, filtered and sorted per `query`.
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError>;

    /// Insert a movie and link the actors in `movie.actor_list` by id.
    async fn create_movie(&self, movie: &Movie) -> Result<Movie, StoreError>;

    /// Overwrite a movie's fields and replace its cast with `movie.actor_list`.
    async fn update_movie(&self, movie: &Movie) -> Result<Movie, StoreError>;

    /// Delete a movie and its cast entries.
    async fn delete_movie(&self, id: i32) -> Result<(), StoreError>;
}
