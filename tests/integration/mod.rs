//! Integration tests against a live PostgreSQL database.
//!
//! These tests require a DATABASE_URL environment variable pointing at a
//! scratch database; the schema is created if missing.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use papka::api::{create_router, AppState};
use papka::catalog::{Actor, Catalog, Movie, MovieQuery, PgCatalog};
use papka::config::Config;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build a migrated catalog from the environment, or None to skip.
async fn test_catalog() -> Option<PgCatalog> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").ok()?;
    let config = Config {
        database_url,
        db_pool_size: 4,
        ..Config::default()
    };

    let catalog = PgCatalog::from_config(&config).ok()?;
    catalog.migrate().await.ok()?;
    Some(catalog)
}

/// Unique suffix so concurrent runs do not see each other's rows.
fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}-{nanos}")
}

fn actor(name: &str) -> Actor {
    Actor {
        name: name.to_string(),
        gender: "female".to_string(),
        ..Actor::default()
    }
}

fn movie(name: &str, rate: i32, cast: &[i32]) -> Movie {
    Movie {
        name: name.to_string(),
        rate,
        actor_list: cast.iter().map(|&id| Actor::reference(id)).collect(),
        ..Movie::default()
    }
}

fn filter(name: &str) -> MovieQuery {
    MovieQuery::parse(Some("id"), Some("asc"), Some(name), None).unwrap()
}

/// Create, list, update and delete a movie with a cast.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_movie_lifecycle() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };

    let lead = catalog.create_actor(&actor(&unique("lead"))).await.unwrap();
    let support = catalog.create_actor(&actor(&unique("support"))).await.unwrap();
    let title = unique("Dune");

    let created = catalog
        .create_movie(&movie(&title, 9, &[lead.id, support.id]))
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.actor_list.len(), 2);

    let listed = catalog.list_movies(&filter(&title)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], created);

    let updated = catalog
        .update_movie(&Movie {
            id: created.id,
            ..movie(&title, 7, &[support.id])
        })
        .await
        .unwrap();
    let cast: Vec<i32> = updated.actor_list.iter().map(|a| a.id).collect();
    assert_eq!(cast, vec![support.id]);

    catalog.delete_movie(created.id).await.unwrap();
    assert!(catalog.list_movies(&filter(&title)).await.unwrap().is_empty());

    catalog.delete_actor(lead.id).await.unwrap();
    catalog.delete_actor(support.id).await.unwrap();
}

/// A failing cast insert must roll back the movie row.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_failed_cast_rolls_back_movie() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };

    let title = unique("Orphan");
    let result = catalog.create_movie(&movie(&title, 5, &[i32::MAX])).await;
    assert!(result.is_err(), "foreign key violation expected");

    assert!(catalog.list_movies(&filter(&title)).await.unwrap().is_empty());
}

/// A cast link that fails mid-update rolls back the rename and the cast swap.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_failed_cast_rolls_back_update() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };

    let lead = catalog.create_actor(&actor(&unique("lead"))).await.unwrap();
    let title = unique("Sequel");
    let created = catalog.create_movie(&movie(&title, 7, &[lead.id])).await.unwrap();

    let result = catalog
        .update_movie(&Movie {
            id: created.id,
            ..movie(&format!("{title}-renamed"), 8, &[lead.id, i32::MAX])
        })
        .await;
    assert!(result.is_err(), "foreign key violation expected");

    let listed = catalog.list_movies(&filter(&title)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, title);
    assert_eq!(listed[0].rate, 7);
    let cast: Vec<i32> = listed[0].actor_list.iter().map(|a| a.id).collect();
    assert_eq!(cast, vec![lead.id]);

    catalog.delete_movie(created.id).await.unwrap();
    catalog.delete_actor(lead.id).await.unwrap();
}

/// Out-of-range rating violates the CHECK constraint.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rate_check_constraint() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };

    assert!(catalog.create_movie(&movie(&unique("Eleven"), 11, &[])).await.is_err());
}

/// Deleting an actor removes it from every cast.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_actor_unlinks() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };

    let gone = catalog.create_actor(&actor(&unique("gone"))).await.unwrap();
    let title = unique("Ensemble");
    let created = catalog.create_movie(&movie(&title, 6, &[gone.id])).await.unwrap();

    catalog.delete_actor(gone.id).await.unwrap();

    let listed = catalog.list_movies(&filter(&title)).await.unwrap();
    assert!(listed[0].actor_list.is_empty());

    catalog.delete_movie(created.id).await.unwrap();
}

/// End-to-end HTTP flow over the Postgres store.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_http_dune_scenario() {
    let catalog = match test_catalog().await {
        Some(c) => c,
        None => {
            println!("Skipping: DATABASE_URL not set or unreachable");
            return;
        }
    };
    let cast = catalog.create_actor(&actor(&unique("cast"))).await.unwrap();
    let app = create_router(AppState::new(Arc::new(catalog.clone())));
    let title = unique("Dune");

    let body = json!({"name": title, "rate": 9, "actor_list": [{"id": cast.id}]});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/movies/add")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/movies?sort_field=rate&sort_order=asc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let movies: Value = serde_json::from_slice(&bytes).unwrap();
    let dune = movies
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == title.as_str())
        .unwrap();
    assert_eq!(dune["actor_list"][0]["id"], cast.id);

    let id = dune["id"].as_i64().unwrap() as i32;
    catalog.delete_movie(id).await.unwrap();
    catalog.delete_actor(cast.id).await.unwrap();
}
