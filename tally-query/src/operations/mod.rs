//! Query operations for the fluent API.
//!
//! - `FindManyOperation` - Find multiple records, with count preloading
//! - `CountOperation` - Count matching records

mod count;
mod find_many;

pub use count::CountOperation;
pub use find_many::FindManyOperation;
