//! Flattening of join rows into nested movies.

use std::collections::HashMap;

use tracing::instrument;

use super::types::{Movie, MovieActorRow};

/// Collapse join rows into one [`Movie`] per id, each carrying its cast.
///
/// Movies keep the position of their first row, so the order the rows were
/// sorted in survives aggregation. Actors keep encounter order within a movie.
/// Rows with NULL actor columns contribute the movie only.
#[instrument(skip_all)]
pub fn aggregate_movies<I>(rows: I) -> Vec<Movie>
where
    I: IntoIterator<Item = MovieActorRow>,
{
    let mut movies: Vec<Movie> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.movie_id).or_insert_with(|| {
            movies.push(row.movie());
            movies.len() - 1
        });

        if let Some(actor) = row.actor() {
            let cast = &mut movies[slot].actor_list;
            if !cast.iter().any(|a| a.id == actor.id) {
                cast.push(actor);
            }
        }
    }

    movies
}
