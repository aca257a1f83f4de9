//! In-process catalog for tests and local demos.
//!
//! Mirrors the PostgreSQL store: the same left join is simulated row by row,
//! filtered and ordered like Postgres, and flattened with
//! [`aggregate_movies`]. Names compare bytewise, which matches a database
//! using the `C` collation; locale-aware collations may order mixed-case
//! names differently. Schema constraints are enforced before any mutation,
//! so a rejected write leaves no partial state.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::aggregate::aggregate_movies;
use super::query::{MovieQuery, SortField, SortOrder};
use super::store::Catalog;
use super::types::{Actor, Movie, MovieActor, MovieActorRow};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct State {
    actors: BTreeMap<i32, Actor>,
    movies: BTreeMap<i32, Movie>,
    links: Vec<MovieActor>,
    last_actor_id: i32,
    last_movie_id: i32,
}

impl State {
    fn join_rows(&self) -> Vec<MovieActorRow> {
        let mut rows = Vec::new();
        for movie in self.movies.values() {
            let mut cast: Vec<&Actor> = self
                .links
                .iter()
                .filter(|link| link.movie_id == movie.id)
                .filter_map(|link| self.actors.get(&link.actor_id))
                .collect();
            cast.sort_by_key(|actor| actor.id);

            if cast.is_empty() {
                rows.push(row_for(movie, None));
            }
            for actor in cast {
                rows.push(row_for(movie, Some(actor)));
            }
        }
        rows
    }

    fn has_actor_matching(&self, movie_id: i32, needle: &str) -> bool {
        self.links
            .iter()
            .filter(|link| link.movie_id == movie_id)
            .filter_map(|link| self.actors.get(&link.actor_id))
            .any(|actor| contains_ignore_case(&actor.name, needle))
    }

    fn check_movie(&self, movie: &Movie) -> Result<Vec<i32>, StoreError> {
        if !movie.rate_in_range() {
            return Err(StoreError::Constraint(format!(
                "rate {} outside {}..={}",
                movie.rate,
                Movie::MIN_RATE,
                Movie::MAX_RATE
            )));
        }
        let ids = movie.actor_ids();
        if let Some(missing) = ids.iter().find(|id| !self.actors.contains_key(*id)) {
            return Err(StoreError::Constraint(format!(
                "actor {missing} does not exist"
            )));
        }
        Ok(ids)
    }

    fn link(&mut self, movie_id: i32, actor_ids: &[i32]) {
        self.links.retain(|link| link.movie_id != movie_id);
        self.links.extend(actor_ids.iter().map(|&actor_id| MovieActor {
            movie_id,
            actor_id,
        }));
    }

    fn stored_movie(&self, id: i32) -> Result<Movie, StoreError> {
        let rows: Vec<MovieActorRow> = self
            .join_rows()
            .into_iter()
            .filter(|row| row.movie_id == id)
            .collect();
        aggregate_movies(rows)
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { entity: "movie", id })
    }
}

fn row_for(movie: &Movie, actor: Option<&Actor>) -> MovieActorRow {
    MovieActorRow {
        movie_id: movie.id,
        movie_name: movie.name.clone(),
        movie_description: movie.description.clone(),
        movie_release: movie.release,
        movie_rate: movie.rate,
        actor_id: actor.map(|a| a.id),
        actor_name: actor.map(|a| a.name.clone()),
        actor_gender: actor.map(|a| a.gender.clone()),
        actor_birth: actor.and_then(|a| a.birth),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Compare two join rows the way `ORDER BY <field> <order>` would.
///
/// NULL sorts above every value, so it comes last ascending and first descending.
/// Names use byte order (`COLLATE "C"`).
fn compare_rows(a: &MovieActorRow, b: &MovieActorRow, field: SortField, order: SortOrder) -> Ordering {
    let ordering = match field {
        SortField::Id => a.movie_id.cmp(&b.movie_id),
        SortField::Name => a.movie_name.cmp(&b.movie_name),
        SortField::Rate => a.movie_rate.cmp(&b.movie_rate),
        SortField::Release => match (a.movie_release, b.movie_release) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
        },
    };
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Thread-safe in-memory [`Catalog`].
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    state: Arc<RwLock<State>>,
    available: Arc<AtomicBool>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate an outage: every operation fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Number of cast rows currently stored.
    pub async fn link_count(&self) -> usize {
        self.state.read().await.links.len()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }

    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError> {
        self.ensure_available()?;
        Ok(self.state.read().await.actors.values().cloned().collect())
    }

    async fn create_actor(&self, actor: &Actor) -> Result<Actor, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        state.last_actor_id += 1;
        let created = Actor {
            id: state.last_actor_id,
            ..actor.clone()
        };
        state.actors.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_actor(&self, actor: &Actor) -> Result<Actor, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let stored = state.actors.get_mut(&actor.id).ok_or(StoreError::NotFound {
            entity: "actor",
            id: actor.id,
        })?;
        *stored = actor.clone();
        Ok(actor.clone())
    }

    async fn delete_actor(&self, id: i32) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if state.actors.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "actor", id });
        }
        state.links.retain(|link| link.actor_id != id);
        Ok(())
    }

    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut rows: Vec<MovieActorRow> = state
            .join_rows()
            .into_iter()
            .filter(|row| query.id.map_or(true, |id| row.movie_id == id))
            .filter(|row| {
                query
                    .movie
                    .as_deref()
                    .map_or(true, |needle| contains_ignore_case(&row.movie_name, needle))
            })
            .filter(|row| {
                query
                    .actor
                    .as_deref()
                    .map_or(true, |needle| state.has_actor_matching(row.movie_id, needle))
            })
            .collect();

        // Stable: rows are generated in (movie id, actor id) order, matching the tie-break.
        rows.sort_by(|a, b| compare_rows(a, b, query.sort_field, query.sort_order));

        Ok(aggregate_movies(rows))
    }

    async fn create_movie(&self, movie: &Movie) -> Result<Movie, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let actor_ids = state.check_movie(movie)?;

        state.last_movie_id += 1;
        let id = state.last_movie_id;
        state.movies.insert(
            id,
            Movie {
                id,
                actor_list: Vec::new(),
                ..movie.clone()
            },
        );
        state.link(id, &actor_ids);
        state.stored_movie(id)
    }

    async fn update_movie(&self, movie: &Movie) -> Result<Movie, StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if !state.movies.contains_key(&movie.id) {
            return Err(StoreError::NotFound {
                entity: "movie",
                id: movie.id,
            });
        }
        let actor_ids = state.check_movie(movie)?;

        state.movies.insert(
            movie.id,
            Movie {
                actor_list: Vec::new(),
                ..movie.clone()
            },
        );
        state.link(movie.id, &actor_ids);
        state.stored_movie(movie.id)
    }

    async fn delete_movie(&self, id: i32) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if state.movies.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "movie", id });
        }
        state.links.retain(|link| link.movie_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    async fn seeded() -> (MemoryCatalog, Vec<Actor>) {
        let catalog = MemoryCatalog::new();
        let mut actors = Vec::new();
        for name in ["Timothée Chalamet", "Zendaya", "Rebecca Ferguson"] {
            let actor = Actor {
                name: name.to_string(),
                ..Actor::default()
            };
            actors.push(catalog.create_actor(&actor).await.unwrap());
        }
        (catalog, actors)
    }

    fn movie(name: &str, rate: i32, cast: &[i32]) -> Movie {
        Movie {
            name: name.to_string(),
            rate,
            actor_list: cast.iter().map(|&id| Actor::reference(id)).collect(),
            ..Movie::default()
        }
    }

    fn names(movies: &[Movie]) -> Vec<&str> {
        movies.iter().map(|m| m.name.as_str()).collect()
    }

    #[tokio::test]
    async fn created_movie_carries_full_cast() {
        let (catalog, actors) = seeded().await;

        let created = catalog
            .create_movie(&movie("Dune", 9, &[actors[1].id, actors[0].id]))
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        let cast: Vec<&str> = created.actor_list.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(cast, vec!["Timothée Chalamet", "Zendaya"]);
    }

    #[tokio::test]
    async fn rejected_create_leaves_no_partial_movie() {
        let (catalog, _) = seeded().await;

        let err = catalog.create_movie(&movie("Ghost", 5, &[1, 99])).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let err = catalog.create_movie(&movie("Too good", 11, &[])).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        assert!(catalog.list_movies(&MovieQuery::default()).await.unwrap().is_empty());
        assert_eq!(catalog.link_count().await, 0);
    }

    #[tokio::test]
    async fn list_orders_by_requested_field() {
        let (catalog, _) = seeded().await;
        catalog.create_movie(&movie("B", 5, &[1])).await.unwrap();
        catalog.create_movie(&movie("A", 9, &[1, 2])).await.unwrap();
        catalog.create_movie(&movie("C", 7, &[])).await.unwrap();

        let by_rate = catalog.list_movies(&MovieQuery::default()).await.unwrap();
        assert_eq!(names(&by_rate), vec!["A", "C", "B"]);

        let by_name = MovieQuery::parse(Some("name"), Some("asc"), None, None).unwrap();
        let listed = catalog.list_movies(&by_name).await.unwrap();
        assert_eq!(names(&listed), vec!["A", "B", "C"]);
        assert_eq!(listed[0].actor_list.len(), 2);
        assert!(listed[2].actor_list.is_empty());
    }

    #[tokio::test]
    async fn null_release_sorts_like_postgres() {
        let catalog = MemoryCatalog::new();
        let dated = Movie {
            release: NaiveDate::from_ymd_opt(2021, 10, 22),
            ..movie("Dated", 1, &[])
        };
        catalog.create_movie(&dated).await.unwrap();
        catalog.create_movie(&movie("Undated", 1, &[])).await.unwrap();

        let asc = MovieQuery::parse(Some("release"), Some("asc"), None, None).unwrap();
        let desc = MovieQuery::parse(Some("release"), Some("desc"), None, None).unwrap();

        assert_eq!(names(&catalog.list_movies(&asc).await.unwrap()), vec!["Dated", "Undated"]);
        assert_eq!(names(&catalog.list_movies(&desc).await.unwrap()), vec!["Undated", "Dated"]);
    }

    #[tokio::test]
    async fn actor_filter_keeps_whole_cast() {
        let (catalog, _) = seeded().await;
        catalog.create_movie(&movie("Dune", 9, &[1, 2])).await.unwrap();
        catalog.create_movie(&movie("Wonka", 6, &[1])).await.unwrap();

        let query = MovieQuery::parse(None, None, None, Some("zend")).unwrap();
        let listed = catalog.list_movies(&query).await.unwrap();

        assert_eq!(names(&listed), vec!["Dune"]);
        assert_eq!(listed[0].actor_list.len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_cast() {
        let (catalog, _) = seeded().await;
        let created = catalog.create_movie(&movie("Dune", 9, &[1, 2])).await.unwrap();

        let updated = catalog
            .update_movie(&Movie {
                id: created.id,
                ..movie("Dune: Part One", 8, &[3])
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "Dune: Part One");
        let cast: Vec<i32> = updated.actor_list.iter().map(|a| a.id).collect();
        assert_eq!(cast, vec![3]);
        assert_eq!(catalog.link_count().await, 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_movie_unchanged() {
        let (catalog, _) = seeded().await;
        let created = catalog.create_movie(&movie("Dune", 9, &[1])).await.unwrap();

        let err = catalog
            .update_movie(&Movie {
                id: created.id,
                ..movie("Dune: Part Two", 8, &[1, i32::MAX])
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let listed = catalog.list_movies(&MovieQuery::default()).await.unwrap();
        assert_eq!(names(&listed), vec!["Dune"]);
        assert_eq!(listed[0].rate, 9);
        let cast: Vec<i32> = listed[0].actor_list.iter().map(|a| a.id).collect();
        assert_eq!(cast, vec![1]);
        assert_eq!(catalog.link_count().await, 1);
    }

    #[tokio::test]
    async fn name_sort_is_bytewise() {
        let catalog = MemoryCatalog::new();
        catalog.create_movie(&movie("apple", 1, &[])).await.unwrap();
        catalog.create_movie(&movie("Banana", 1, &[])).await.unwrap();

        let asc = MovieQuery::parse(Some("name"), Some("asc"), None, None).unwrap();
        assert_eq!(names(&catalog.list_movies(&asc).await.unwrap()), vec!["Banana", "apple"]);
    }

    #[tokio::test]
    async fn deleting_actor_removes_links() {
        let (catalog, _) = seeded().await;
        catalog.create_movie(&movie("Dune", 9, &[1, 2])).await.unwrap();

        catalog.delete_actor(2).await.unwrap();

        assert_eq!(catalog.link_count().await, 1);
        let listed = catalog.list_movies(&MovieQuery::default()).await.unwrap();
        assert_eq!(listed[0].actor_list.len(), 1);
        assert!(matches!(
            catalog.delete_actor(2).await,
            Err(StoreError::NotFound { entity: "actor", id: 2 })
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let catalog = MemoryCatalog::new();
        catalog.set_available(false);

        assert!(matches!(catalog.ping().await, Err(StoreError::Unavailable)));
        assert!(catalog.list_actors().await.is_err());

        catalog.set_available(true);
        assert!(catalog.ping().await.is_ok());
    }
}
