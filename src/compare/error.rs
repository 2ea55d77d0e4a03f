use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to fetch workspace files")]
    WorkspaceListing(#[source] BackendError),

    #[error("failed to fetch repository files")]
    RepositoryListing(#[source] BackendError),

    /// A descriptor the comparator cannot classify.
    #[error("malformed {side} file descriptor at index {index}: {reason}")]
    MalformedDescriptor {
        side: &'static str,
        index: usize,
        reason: &'static str,
    },
}
