use super::keys::SecureKeyResolver;
use super::AccessTokenClaims;
use crate::errors::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::trace;

/// Signs and verifies compact HS256 tokens with per-subject keys.
///
/// Key resolution during verification uses the subject claimed inside the
/// token, never an external hint, so a caller cannot substitute another
/// subject's key.
pub struct TokenCodec {
    resolver: SecureKeyResolver,
}

impl TokenCodec {
    pub fn new(resolver: SecureKeyResolver) -> Self {
        Self { resolver }
    }

    /// Serializes and signs a claim set with the subject's key.
    pub async fn sign(&self, claims: &AccessTokenClaims) -> Result<String, AuthError> {
        let key = self.resolver.resolve(&claims.sub).await?;
        trace!("sign token {} for subject {}", claims.jti, claims.sub);
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key.bytes()),
        )
        .map_err(|e| AuthError::invalid_argument(format!("failed to encode claims: {e}")))
    }

    /// Verifies signature and expiration and returns the claim set.
    pub async fn verify(&self, compact: &str) -> Result<AccessTokenClaims, AuthError> {
        self.decode(compact, true).await
    }

    /// Like [`TokenCodec::verify`] but accepts an expired token, for the
    /// refresh path. The signature is still fully verified.
    pub(crate) async fn decode_expired_ok(
        &self,
        compact: &str,
    ) -> Result<AccessTokenClaims, AuthError> {
        self.decode(compact, false).await
    }

    async fn decode(&self, compact: &str, validate_exp: bool) -> Result<AccessTokenClaims, AuthError> {
        let subject = claimed_subject(compact)?;
        let key = self.resolver.resolve(&subject).await?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp", "sub"]);

        match jsonwebtoken::decode::<AccessTokenClaims>(
            compact,
            &DecodingKey::from_secret(key.bytes()),
            &validation,
        ) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::claims_invalid(e.to_string()),
            }),
        }
    }
}

/// Extracts the subject from the *unverified* payload segment. The result is
/// only used to resolve the verification key; every claim is re-read from
/// the verified decode.
fn claimed_subject(compact: &str) -> Result<String, AuthError> {
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::claims_invalid("token is not a compact JWS"));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|_| AuthError::claims_invalid("token payload is not valid base64url"))?;
    let value: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|_| AuthError::claims_invalid("token payload is not valid JSON"))?;

    value
        .get("sub")
        .and_then(serde_json::Value::as_str)
        .filter(|subject| !subject.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AuthError::claims_invalid("sub claim is missing"))
}
