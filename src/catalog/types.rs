//! Catalog entity types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A person who appears in movies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actor {
    /// Primary key, assigned by the store.
    pub id: i32,
    /// Full name.
    pub name: String,
    /// Free-form gender string.
    pub gender: String,
    /// Date of birth (YYYY-MM-DD).
    pub birth: Option<NaiveDate>,
}

impl Actor {
    /// Reference to an existing actor by id only.
    pub fn reference(id: i32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// A movie together with its cast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    /// Primary key, assigned by the store.
    pub id: i32,
    /// Title.
    pub name: String,
    /// Synopsis.
    pub description: String,
    /// Release date (YYYY-MM-DD).
    pub release: Option<NaiveDate>,
    /// Rating, 0 to 10 inclusive.
    pub rate: i32,
    /// Cast. Only `id` is read on writes.
    pub actor_list: Vec<Actor>,
}

impl Movie {
    /// Minimum allowed rating.
    pub const MIN_RATE: i32 = 0;
    /// Maximum allowed rating.
    pub const MAX_RATE: i32 = 10;

    /// Actor ids referenced by this movie, first occurrence wins.
    pub fn actor_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = Vec::with_capacity(self.actor_list.len());
        for actor in &self.actor_list {
            if !ids.contains(&actor.id) {
                ids.push(actor.id);
            }
        }
        ids
    }

    /// Check the rating against the schema constraint.
    pub fn rate_in_range(&self) -> bool {
        (Self::MIN_RATE..=Self::MAX_RATE).contains(&self.rate)
    }
}

/// Row of the `movie_actors` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovieActor {
    /// Referenced movie.
    pub movie_id: i32,
    /// Referenced actor.
    pub actor_id: i32,
}

/// One row of the movies ⟕ movie_actors ⟕ actors join.
///
/// Actor columns are `None` when the movie has no cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieActorRow {
    /// Movie id.
    pub movie_id: i32,
    /// Movie title.
    pub movie_name: String,
    /// Movie synopsis.
    pub movie_description: String,
    /// Movie release date.
    pub movie_release: Option<NaiveDate>,
    /// Movie rating.
    pub movie_rate: i32,
    /// Actor id, NULL for movies without actors.
    pub actor_id: Option<i32>,
    /// Actor name.
    pub actor_name: Option<String>,
    /// Actor gender.
    pub actor_gender: Option<String>,
    /// Actor date of birth.
    pub actor_birth: Option<NaiveDate>,
}

impl MovieActorRow {
    /// Movie part of the row, with an empty cast.
    pub fn movie(&self) -> Movie {
        Movie {
            id: self.movie_id,
            name: self.movie_name.clone(),
            description: self.movie_description.clone(),
            release: self.movie_release,
            rate: self.movie_rate,
            actor_list: Vec::new(),
        }
    }

    /// Actor part of the row, if the join matched one.
    pub fn actor(&self) -> Option<Actor> {
        let id = self.actor_id?;
        Some(Actor {
            id,
            name: self.actor_name.clone().unwrap_or_default(),
            gender: self.actor_gender.clone().unwrap_or_default(),
            birth: self.actor_birth,
        })
    }
}
