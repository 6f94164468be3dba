use crate::stores::StoreError;
use thiserror::Error;

/// Errors surfaced by the authentication and authorization core.
///
/// Verification failures are deliberately split: `TokenExpired` signals that
/// a refresh flow may still succeed, while `InvalidSignature` and
/// `ClaimsInvalid` require a full re-login.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no subject given and no authenticated caller present")]
    NotAuthenticated,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error("token is expired")]
    TokenExpired,

    #[error("token claims rejected: {0}")]
    ClaimsInvalid(String),

    #[error("account is temporarily locked")]
    AccountLocked,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // collaborator store failures propagate unchanged, the core has no
    // compensating action
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub(crate) fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn claims_invalid<S: Into<String>>(message: S) -> Self {
        Self::ClaimsInvalid(message.into())
    }
}
