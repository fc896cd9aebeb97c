use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport failure, shown to the user as-is.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Rejected before any request was sent.
    #[error("{0}")]
    Invalid(String),

    #[error("Not signed in")]
    NotSignedIn,

    /// The credential changed while the request was in flight; the result
    /// was discarded.
    #[error("Session changed before the request completed")]
    Superseded,
}
