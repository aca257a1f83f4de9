//! Movie and actor catalog HTTP API.
//!
//! A JSON API over three PostgreSQL tables: `actors`, `movies` and the
//! `movie_actors` join table. Listing movies runs a single left join and
//! folds the repeated rows back into one movie per id:
//!
//! ```text
//! m.id | m.name | a.id | a.name
//! -----+--------+------+---------
//!    1 | Dune   |    1 | Chalamet
//!    1 | Dune   |    2 | Zendaya      =>  Dune  [Chalamet, Zendaya]
//!    2 | Solaris| NULL | NULL         =>  Solaris []
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`catalog`]: Entities, query building, aggregation and storage backends
//! - [`api`]: HTTP routes and handlers
//! - [`metrics`]: Prometheus latency and error metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
