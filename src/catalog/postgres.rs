//! PostgreSQL implementation of [`Catalog`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row, Transaction};
use tracing::{debug, info, instrument};

use super::aggregate::aggregate_movies;
use super::query::{build_movie_list, MovieQuery, QueryParam};
use super::schema::SCHEMA_SQL;
use super::store::Catalog;
use super::types::{Actor, Movie, MovieActorRow};
use crate::config::Config;
use crate::error::StoreError;
use crate::metrics;

/// Catalog backed by a pooled PostgreSQL connection.
#[derive(Clone)]
pub struct PgCatalog {
    pool: Pool,
    timeout: Duration,
}

impl std::fmt::Debug for PgCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCatalog")
            .field("pool_size", &self.pool.status().size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PgCatalog {
    /// Wrap an existing pool. Every operation is bounded by `timeout`.
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Build the pool described by `config`.
    ///
    /// No connection is opened until the first operation.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let pg_config: tokio_postgres::Config = config.database_url.parse()?;
        let timeout = config.db_timeout();

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(config.db_pool_size)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .build()
            .map_err(|e| StoreError::PoolBuild(e.to_string()))?;

        Ok(Self::new(pool, timeout))
    }

    /// Create the catalog tables if they do not exist.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.bounded("migrate", async {
            let conn = self.pool.get().await?;
            conn.batch_execute(SCHEMA_SQL).await?;
            info!("Schema is up to date");
            Ok(())
        })
        .await
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        let _timer = metrics::timer_store(op);
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

fn sql_params(params: &[QueryParam]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|param| match param {
            QueryParam::Text(text) => text as &(dyn ToSql + Sync),
            QueryParam::Int(int) => int as &(dyn ToSql + Sync),
        })
        .collect()
}

fn actor_from_row(row: &Row) -> Result<Actor, StoreError> {
    Ok(Actor {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        gender: row.try_get(2)?,
        birth: row.try_get(3)?,
    })
}

fn join_row_from_row(row: &Row) -> Result<MovieActorRow, StoreError> {
    Ok(MovieActorRow {
        movie_id: row.try_get(0)?,
        movie_name: row.try_get(1)?,
        movie_description: row.try_get(2)?,
        movie_release: row.try_get(3)?,
        movie_rate: row.try_get(4)?,
        actor_id: row.try_get(5)?,
        actor_name: row.try_get(6)?,
        actor_gender: row.try_get(7)?,
        actor_birth: row.try_get(8)?,
    })
}

fn movies_from_rows(rows: &[Row]) -> Result<Vec<Movie>, StoreError> {
    let joined = rows
        .iter()
        .map(join_row_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aggregate_movies(joined))
}

/// Insert one cast row per actor id.
async fn link_cast(tx: &Transaction<'_>, movie_id: i32, actor_ids: &[i32]) -> Result<(), StoreError> {
    if actor_ids.is_empty() {
        return Ok(());
    }

    let stmt = tx
        .prepare("INSERT INTO movie_actors (movie_id, actor_id) VALUES ($1, $2)")
        .await?;
    for actor_id in actor_ids {
        tx.execute(&stmt, &[&movie_id, actor_id]).await?;
    }
    debug!(movie_id, count = actor_ids.len(), "Linked cast");
    Ok(())
}

/// Re-read a movie with its cast inside the current transaction.
async fn fetch_movie(tx: &Transaction<'_>, id: i32) -> Result<Movie, StoreError> {
    let built = build_movie_list(&MovieQuery::by_id(id));
    let rows = tx.query(built.sql.as_str(), &sql_params(&built.params)).await?;
    movies_from_rows(&rows)?
        .into_iter()
        .next()
        .ok_or(StoreError::NotFound { entity: "movie", id })
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded("ping", async {
            let conn = self.pool.get().await?;
            conn.batch_execute("SELECT 1").await?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError> {
        self.bounded("list_actors", async {
            let conn = self.pool.get().await?;
            let rows = conn
                .query("SELECT id, name, gender, birth FROM actors ORDER BY id", &[])
                .await?;
            rows.iter().map(actor_from_row).collect()
        })
        .await
    }

    #[instrument(skip(self, actor), fields(name = %actor.name))]
    async fn create_actor(&self, actor: &Actor) -> Result<Actor, StoreError> {
        self.bounded("create_actor", async {
            let conn = self.pool.get().await?;
            let row = conn
                .query_one(
                    "INSERT INTO actors (name, gender, birth) VALUES ($1, $2, $3) \
                     RETURNING id, name, gender, birth",
                    &[&actor.name, &actor.gender, &actor.birth],
                )
                .await?;
            let created = actor_from_row(&row)?;
            info!(id = created.id, "Actor created");
            Ok(created)
        })
        .await
    }

    #[instrument(skip(self, actor), fields(id = actor.id))]
    async fn update_actor(&self, actor: &Actor) -> Result<Actor, StoreError> {
        self.bounded("update_actor", async {
            let conn = self.pool.get().await?;
            let row = conn
                .query_opt(
                    "UPDATE actors SET name = $1, gender = $2, birth = $3 WHERE id = $4 \
                     RETURNING id, name, gender, birth",
                    &[&actor.name, &actor.gender, &actor.birth, &actor.id],
                )
                .await?
                .ok_or(StoreError::NotFound {
                    entity: "actor",
                    id: actor.id,
                })?;
            actor_from_row(&row)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_actor(&self, id: i32) -> Result<(), StoreError> {
        self.bounded("delete_actor", async {
            let mut conn = self.pool.get().await?;
            let tx = conn.transaction().await?;

            let unlinked = tx
                .execute("DELETE FROM movie_actors WHERE actor_id = $1", &[&id])
                .await?;
            let deleted = tx.execute("DELETE FROM actors WHERE id = $1", &[&id]).await?;
            if deleted == 0 {
                return Err(StoreError::NotFound { entity: "actor", id });
            }

            tx.commit().await?;
            info!(unlinked, "Actor deleted");
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, query), fields(sort = %query.sort_field, order = %query.sort_order))]
    async fn list_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>, StoreError> {
        let built = build_movie_list(query);
        self.bounded("list_movies", async {
            let conn = self.pool.get().await?;
            let rows = conn
                .query(built.sql.as_str(), &sql_params(&built.params))
                .await?;
            debug!(rows = rows.len(), "Fetched movie join rows");
            movies_from_rows(&rows)
        })
        .await
    }

    #[instrument(skip(self, movie), fields(name = %movie.name))]
    async fn create_movie(&self, movie: &Movie) -> Result<Movie, StoreError> {
        self.bounded("create_movie", async {
            let mut conn = self.pool.get().await?;
            let tx = conn.transaction().await?;

            let row = tx
                .query_one(
                    "INSERT INTO movies (name, description, release, rate) \
                     VALUES ($1, $2, $3, $4) RETURNING id",
                    &[&movie.name, &movie.description, &movie.release, &movie.rate],
                )
                .await?;
            let id: i32 = row.try_get(0)?;

            link_cast(&tx, id, &movie.actor_ids()).await?;
            let created = fetch_movie(&tx, id).await?;

            tx.commit().await?;
            info!(id, "Movie created");
            Ok(created)
        })
        .await
    }

    #[instrument(skip(self, movie), fields(id = movie.id))]
    async fn update_movie(&self, movie: &Movie) -> Result<Movie, StoreError> {
        self.bounded("update_movie", async {
            let mut conn = self.pool.get().await?;
            let tx = conn.transaction().await?;

            let updated = tx
                .execute(
                    "UPDATE movies SET name = $1, description = $2, release = $3, rate = $4 \
                     WHERE id = $5",
                    &[
                        &movie.name,
                        &movie.description,
                        &movie.release,
                        &movie.rate,
                        &movie.id,
                    ],
                )
                .await?;
            if updated == 0 {
                return Err(StoreError::NotFound {
                    entity: "movie",
                    id: movie.id,
                });
            }

            tx.execute("DELETE FROM movie_actors WHERE movie_id = $1", &[&movie.id])
                .await?;
            link_cast(&tx, movie.id, &movie.actor_ids()).await?;
            let stored = fetch_movie(&tx, movie.id).await?;

            tx.commit().await?;
            Ok(stored)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_movie(&self, id: i32) -> Result<(), StoreError> {
        self.bounded("delete_movie", async {
            let mut conn = self.pool.get().await?;
            let tx = conn.transaction().await?;

            tx.execute("DELETE FROM movie_actors WHERE movie_id = $1", &[&id])
                .await?;
            let deleted = tx.execute("DELETE FROM movies WHERE id = $1", &[&id]).await?;
            if deleted == 0 {
                return Err(StoreError::NotFound { entity: "movie", id });
            }

            tx.commit().await?;
            info!("Movie deleted");
            Ok(())
        })
        .await
    }
}
