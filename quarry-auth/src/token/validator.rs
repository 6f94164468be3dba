use super::AccessTokenClaims;
use crate::context::RequestContext;
use crate::errors::AuthError;

/// Post-decode claim validation, run after signature and expiration checks.
///
/// Validators form a closed, ordered chain fixed at startup; the first
/// failure aborts verification with [`AuthError::ClaimsInvalid`].
pub trait TokenClaimsValidator: Send + Sync {
    fn validate(&self, claims: &AccessTokenClaims, context: &RequestContext)
        -> Result<(), AuthError>;
}

/// Runs a validator chain in order.
pub(crate) fn run_chain(
    validators: &[Box<dyn TokenClaimsValidator>],
    claims: &AccessTokenClaims,
    context: &RequestContext,
) -> Result<(), AuthError> {
    for validator in validators {
        validator.validate(claims, context)?;
    }
    Ok(())
}
