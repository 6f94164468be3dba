//! XSRF binding for browser-session tokens.
//!
//! The enricher stamps a random `xsrf` claim into tokens issued to browser
//! sessions. Clients echo the value in the `X-XSRF-Token` header on every
//! request, and the validator compares it against the claim, which binds the
//! signed cookie token to requests the page actually made.

use super::builder::{AccessTokenBuilder, AccessTokenEnricher};
use super::validator::TokenClaimsValidator;
use super::AccessTokenClaims;
use crate::context::RequestContext;
use crate::errors::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::Rng;

pub const XSRF_CLAIM: &str = "xsrf";
pub const XSRF_HEADER: &str = "X-XSRF-Token";

/// Adds a random `xsrf` claim unless one is already present. Include this
/// enricher in the builder factory for browser-session token issuance only;
/// tokens for non-browser clients should stay free of the claim.
pub struct XsrfTokenEnricher;

impl AccessTokenEnricher for XsrfTokenEnricher {
    fn enrich(&self, builder: &mut AccessTokenBuilder) {
        if !builder.has_custom(XSRF_CLAIM) {
            builder.add_custom(XSRF_CLAIM, generate_xsrf_token());
        }
    }
}

/// Compares the `xsrf` claim with the `X-XSRF-Token` request header. Tokens
/// without the claim pass unchecked.
pub struct XsrfClaimsValidator;

impl TokenClaimsValidator for XsrfClaimsValidator {
    fn validate(
        &self,
        claims: &AccessTokenClaims,
        context: &RequestContext,
    ) -> Result<(), AuthError> {
        let Some(expected) = claims.custom(XSRF_CLAIM) else {
            return Ok(());
        };
        let expected = expected
            .as_str()
            .ok_or_else(|| AuthError::claims_invalid("xsrf claim must be a string"))?;

        match context.header(XSRF_HEADER) {
            Some(header) if header == expected => Ok(()),
            Some(_) => Err(AuthError::claims_invalid("xsrf token does not match")),
            None => Err(AuthError::claims_invalid("xsrf header is missing")),
        }
    }
}

fn generate_xsrf_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
