//! Relational schema for the catalog.

/// Idempotent DDL for the three catalog tables.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS actors (
    id      SERIAL PRIMARY KEY,
    name    TEXT NOT NULL,
    gender  TEXT NOT NULL DEFAULT '',
    birth   DATE
);

CREATE TABLE IF NOT EXISTS movies (
    id          SERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    release     DATE,
    rate        INTEGER NOT NULL DEFAULT 0 CHECK (rate BETWEEN 0 AND 10)
);

CREATE TABLE IF NOT EXISTS movie_actors (
    movie_id INTEGER NOT NULL REFERENCES movies (id) ON DELETE CASCADE,
    actor_id INTEGER NOT NULL REFERENCES actors (id) ON DELETE CASCADE,
    PRIMARY KEY (movie_id, actor_id)
);

CREATE INDEX IF NOT EXISTS movie_actors_actor_id_idx ON movie_actors (actor_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_constraints() {
        assert!(SCHEMA_SQL.contains("CHECK (rate BETWEEN 0 AND 10)"));
        assert!(SCHEMA_SQL.contains("PRIMARY KEY (movie_id, actor_id)"));
        assert_eq!(SCHEMA_SQL.matches("ON DELETE CASCADE").count(), 2);
    }
}
