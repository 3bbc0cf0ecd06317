//! Location port: the URL query string.

use indexmap::IndexMap;
use stencil_domain::VariableValue;

/// Query parameters; repeated keys collapse into a list value.
pub type UrlQueryMap = IndexMap<String, VariableValue>;

/// A partial query update; `None` removes the key.
pub type UrlQueryUpdate = IndexMap<String, Option<VariableValue>>;

/// Errors raised when writing the location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The resulting URL exceeds the storage limit.
    #[error("URL query too long: {length} > {limit}")]
    TooLong {
        /// Length of the rejected query.
        length: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The backing store rejected the write.
    #[error("location storage failed: {0}")]
    Storage(String),
}

/// Read and update access to the current URL query.
pub trait LocationService: Send + Sync {
    /// Returns the current query parameters.
    fn get_search(&self) -> UrlQueryMap;

    /// Merges `update` into the query; `replace` replaces the history entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the new location cannot be stored.
    fn partial(&self, update: &UrlQueryUpdate, replace: bool) -> Result<(), LocationError>;
}
