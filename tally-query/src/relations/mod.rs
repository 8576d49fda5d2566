//! Association metadata and generic association preloading.
//!
//! - [`AssociationSpec`] describes a named association on a model
//! - [`PreloadOptions`] refines what an eager load fetches
//! - [`RelationLoader`] fills each owner's association cache in batched queries
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut owners: Vec<&mut Record> = posts.iter_mut().collect();
//! RelationLoader::new(&engine, &schema)
//!     .preload(&mut owners, "comments", &PreloadOptions::new())
//!     .await?;
//! ```

mod include;
mod loader;
mod spec;

pub use include::PreloadOptions;
pub use loader::RelationLoader;
pub use spec::{AssociationKind, AssociationSpec};

pub(crate) use loader::{KeyColumns, association_scope, owner_keys};
