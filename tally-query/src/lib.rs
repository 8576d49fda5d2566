//! # tally-query
//!
//! Query building and association count preloading for the Tally ORM.
//!
//! This crate provides:
//! - A schema registry of models and their associations
//! - Filters, ordering and an immutable SELECT builder (`Scope`)
//! - Generic association preloading (`RelationLoader`)
//! - Count preloading for `has_many` and `has_many :through` associations
//!   (`CountPreloader`), one grouped query per association
//! - Query chains that request counts and run them on load (`FindManyOperation`)
//!
//! ## Schema
//!
//! ```rust
//! use tally_query::{AssociationSpec, ModelSpec, Schema};
//!
//! let schema = Schema::new()
//!     .model(
//!         ModelSpec::new("Author", "authors")
//!             .association(AssociationSpec::has_many("contracts", "Contract", "author_id"))
//!             .association(AssociationSpec::has_many_through("books", "contracts")),
//!     )
//!     .model(
//!         ModelSpec::new("Contract", "contracts")
//!             .association(AssociationSpec::belongs_to("book", "Book", "book_id")),
//!     )
//!     .model(ModelSpec::new("Book", "books"));
//!
//! assert!(schema.describe_association("Author", "books").is_ok());
//! ```
//!
//! ## Count Preloading
//!
//! ```rust,ignore
//! let builder = QueryBuilder::new(engine, schema);
//!
//! let authors = builder
//!     .find_many("Author")?
//!     .include_count("books")
//!     .include_count_with("books", CountOptions::new().count_name("novels").r#where(is_novel))
//!     .exec()
//!     .await?;
//!
//! for author in &authors {
//!     println!("{:?} wrote {:?} books", author.get("name"), author.count("books_count"));
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tally_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::unsupported_association("Comment", "post", "belongs_to");
//! assert_eq!(err.code, ErrorCode::UnsupportedAssociation);
//! assert_eq!(err.code.code(), "P1006");
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod operations;
pub mod pagination;
pub mod preload;
pub mod query;
pub mod record;
pub mod relations;
pub mod schema;
pub mod scope;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::PreloadConfig;
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{Filter, FilterValue};
pub use operations::{CountOperation, FindManyOperation};
pub use pagination::Pagination;
pub use preload::{
    AggregateQuery, CountOptions, CountPreloader, CountRequest, CountStrategy, DirectCount, Position,
    ThroughCount,
};
pub use query::QueryBuilder;
pub use record::{LoadedAssociation, Record, RecordKey};
pub use relations::{AssociationKind, AssociationSpec, PreloadOptions, RelationLoader};
pub use schema::{ModelSpec, Schema};
pub use scope::Scope;
pub use traits::{BoxFuture, QueryEngine, Row};
pub use types::{OrderBy, OrderByField, Select, SortOrder};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::PreloadConfig;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::operations::*;
    pub use crate::preload::{CountOptions, CountPreloader};
    pub use crate::query::QueryBuilder;
    pub use crate::record::{Record, RecordKey};
    pub use crate::relations::{AssociationSpec, PreloadOptions};
    pub use crate::schema::{ModelSpec, Schema};
    pub use crate::traits::QueryEngine;
    pub use crate::types::{OrderBy, OrderByField};
}
