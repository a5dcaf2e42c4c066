use thiserror::Error;

use crate::reddit::ApiError;

#[derive(Debug, Error)]
pub enum CollectError {
    /// Authentication or the identity check failed while connecting.
    #[error("could not connect to Reddit: {0}")]
    Connect(#[source] ApiError),

    /// A fetch or search failed part way; whatever was collected is discarded.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ApiError,
    },
}

impl CollectError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            CollectError::Connect(e) => e,
            CollectError::Remote { source, .. } => source,
        }
    }
}
