//! Offset pagination for query chains.
//!
//! ```rust
//! use tally_query::Pagination;
//!
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "LIMIT 20 OFFSET 10");
//! assert!(Pagination::new().is_empty());
//! ```

use std::fmt::Write;

/// Pagination configuration for queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Generate the SQL LIMIT/OFFSET clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(32);
        self.write_sql(&mut sql);
        sql
    }

    /// Write the SQL LIMIT/OFFSET clause directly to a buffer.
    pub fn write_sql(&self, buffer: &mut String) {
        match (self.take, self.skip) {
            (Some(take), Some(skip)) => {
                let _ = write!(buffer, "LIMIT {} OFFSET {}", take, skip);
            }
            (Some(take), None) => {
                let _ = write!(buffer, "LIMIT {}", take);
            }
            // SQLite only accepts OFFSET after a LIMIT.
            (None, Some(skip)) => {
                let _ = write!(buffer, "LIMIT -1 OFFSET {}", skip);
            }
            (None, None) => {}
        }
    }
}
