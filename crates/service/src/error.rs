use thiserror::Error;

use fixdesk_auth::AuthzError;
use fixdesk_core::UserId;
use fixdesk_infra::{DispatchError, SequenceError};

/// Error surface of the application service.
///
/// Everything a caller can observe folds into one of these; transports map
/// them onto their own status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The acting or referenced user has no directory record.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// Authorization denied (role or ownership).
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Command execution failed (domain rule, concurrency, store).
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Reference number allocation failed.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
