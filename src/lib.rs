//! # Tally
//!
//! Association count preloading for ORM records.
//!
//! Rendering "N comments" next to every post in a list normally costs one
//! `COUNT(*)` query per post. Tally counts the children of every loaded
//! owner with one grouped query per association and stores the result on
//! each record:
//!
//! - `has_many` associations, including polymorphic `as:` ones
//! - `has_many :through` associations, counted through their intermediate
//!   records, including polymorphic sources narrowed by `source_type`
//! - association conditions and ordering, plus per-call conditions and joins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tally::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QueryError> {
//!     let schema = Schema::new()
//!         .model(
//!             ModelSpec::new("Author", "authors")
//!                 .association(AssociationSpec::has_many("contracts", "Contract", "author_id"))
//!                 .association(AssociationSpec::has_many_through("books", "contracts")),
//!         )
//!         .model(
//!             ModelSpec::new("Contract", "contracts")
//!                 .association(AssociationSpec::belongs_to("book", "Book", "book_id")),
//!         )
//!         .model(ModelSpec::new("Book", "books"));
//!
//!     let engine = SqliteEngine::from_url("sqlite://library.db").await?;
//!     let authors = QueryBuilder::new(engine, schema)
//!         .find_many("Author")?
//!         .include_count("books")
//!         .exec()
//!         .await?;
//!
//!     for author in &authors {
//!         println!("{:?}", author.count("books_count"));
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Query chains, schema descriptions and count preloading.
pub mod query {
    pub use tally_query::*;
}

/// The SQLite engine.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use tally_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tally_query::prelude::*;
    pub use tally_query::{AssociationKind, ErrorCode};

    #[cfg(feature = "sqlite")]
    pub use tally_sqlite::{SqliteConfig, SqliteEngine};
}

// Re-export key types at the crate root
pub use tally_query::{CountOptions, QueryBuilder, QueryError, QueryResult, Record, Schema};
