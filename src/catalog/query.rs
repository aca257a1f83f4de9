//! Movie list query construction.
//!
//! User input never reaches the SQL text directly: sort fields and orders are
//! parsed into closed enums first, and filters are bound as parameters.

use std::fmt::Write as _;
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::QueryError;

/// Movie columns the list endpoint may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortField {
    /// Primary key.
    Id,
    /// Title.
    Name,
    /// Release date.
    Release,
    /// Rating.
    #[default]
    Rate,
}

impl SortField {
    /// Qualified column name in the join query.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "m.id",
            SortField::Name => "m.name",
            SortField::Release => "m.release",
            SortField::Rate => "m.rate",
        }
    }

    /// Parse a query-string value. Missing or blank selects the default.
    pub fn parse_param(raw: Option<&str>) -> Result<Self, QueryError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(value) => {
                Self::from_str(value).map_err(|_| QueryError::InvalidSortField(value.to_string()))
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parse a query-string value. Missing or blank selects the default.
    pub fn parse_param(raw: Option<&str>) -> Result<Self, QueryError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(value) => {
                Self::from_str(value).map_err(|_| QueryError::InvalidSortOrder(value.to_string()))
            }
        }
    }
}

/// Validated movie list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieQuery {
    /// Column to order by.
    pub sort_field: SortField,
    /// Direction.
    pub sort_order: SortOrder,
    /// Case-insensitive substring of the movie title.
    pub movie: Option<String>,
    /// Case-insensitive substring of any cast member's name.
    pub actor: Option<String>,
    /// Restrict to a single movie.
    pub id: Option<i32>,
}

impl MovieQuery {
    /// Build a query from raw query-string values.
    pub fn parse(
        sort_field: Option<&str>,
        sort_order: Option<&str>,
        movie: Option<&str>,
        actor: Option<&str>,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            sort_field: SortField::parse_param(sort_field)?,
            sort_order: SortOrder::parse_param(sort_order)?,
            movie: non_blank(movie),
            actor: non_blank(actor),
            id: None,
        })
    }

    /// Query for one movie by id.
    pub fn by_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Bound query parameter, independent of the database driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Text value.
    Text(String),
    /// 32-bit integer value.
    Int(i32),
}

/// SQL text plus its positional parameters (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    /// Statement text.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<QueryParam>,
}

impl BuiltQuery {
    fn bind(&mut self, param: QueryParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }
}

const MOVIE_JOIN_SELECT: &str = "SELECT m.id, m.name, m.description, m.release, m.rate, \
     a.id, a.name, a.gender, a.birth \
     FROM movies m \
     LEFT JOIN movie_actors ma ON m.id = ma.movie_id \
     LEFT JOIN actors a ON ma.actor_id = a.id";

/// Build the movie list join query.
///
/// Produces one row per (movie, actor) pair and one row with NULL actor
/// columns for movies without a cast. Rows of the same movie are adjacent
/// within equal sort keys thanks to the `m.id` tie-break.
pub fn build_movie_list(query: &MovieQuery) -> BuiltQuery {
    let mut built = BuiltQuery {
        sql: MOVIE_JOIN_SELECT.to_string(),
        params: Vec::new(),
    };
    let mut conditions: Vec<String> = Vec::new();

    if let Some(id) = query.id {
        let placeholder = built.bind(QueryParam::Int(id));
        conditions.push(format!("m.id = {placeholder}"));
    }

    if let Some(movie) = &query.movie {
        let placeholder = built.bind(QueryParam::Text(like_pattern(movie)));
        conditions.push(format!("m.name ILIKE {placeholder}"));
    }

    if let Some(actor) = &query.actor {
        let placeholder = built.bind(QueryParam::Text(like_pattern(actor)));
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM movie_actors fma \
             JOIN actors fa ON fa.id = fma.actor_id \
             WHERE fma.movie_id = m.id AND fa.name ILIKE {placeholder})"
        ));
    }

    if !conditions.is_empty() {
        let _ = write!(built.sql, " WHERE {}", conditions.join(" AND "));
    }

    let _ = write!(
        built.sql,
        " ORDER BY {} {}, m.id, a.id",
        query.sort_field.column(),
        query.sort_order.keyword()
    );

    built
}

/// Wrap a user string as a `%substring%` LIKE pattern with wildcards escaped.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
