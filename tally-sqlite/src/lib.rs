//! SQLite query engine for the Tally ORM.
//!
//! [`SqliteEngine`] implements [`tally_query::QueryEngine`] on top of
//! `tokio-rusqlite`, so finders and count preloads run against a SQLite
//! database without blocking the async runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use tally_query::{CountOptions, QueryBuilder};
//! use tally_sqlite::SqliteEngine;
//!
//! let engine = SqliteEngine::from_url("sqlite://./blog.db").await?;
//! let builder = QueryBuilder::new(engine, schema);
//!
//! let posts = builder.find_many("Post")?.include_count("comments").exec().await?;
//! println!("{:?}", posts[0].count("comments_count"));
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use engine::{SqliteEngine, convert_placeholders};
pub use error::{SqliteError, SqliteResult};
