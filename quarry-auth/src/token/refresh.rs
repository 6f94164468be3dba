use super::builder::AccessTokenBuilderFactory;
use super::codec::TokenCodec;
use super::{AccessToken, AccessTokenClaims};
use crate::errors::AuthError;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

/// Decides whether an eligible token should actually be reissued now.
pub trait RefreshStrategy: Send + Sync {
    fn should_refresh(&self, claims: &AccessTokenClaims, now: DateTime<Utc>) -> bool;
}

/// Refreshes once the elapsed share of the token lifespan exceeds a
/// configured fraction, which amortizes refresh calls instead of reissuing
/// on every request.
///
/// The boundary is strict: `elapsed / lifespan > threshold`, so a token at
/// exactly the threshold is not yet due.
pub struct PercentageRefreshStrategy {
    threshold: f64,
}

impl PercentageRefreshStrategy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl RefreshStrategy for PercentageRefreshStrategy {
    fn should_refresh(&self, claims: &AccessTokenClaims, now: DateTime<Utc>) -> bool {
        let lifespan = claims.exp - claims.iat;
        if lifespan <= 0 {
            return false;
        }
        let elapsed = now.timestamp() - claims.iat;
        elapsed as f64 / lifespan as f64 > self.threshold
    }
}

/// Reissues expiring tokens while they are still inside their refresh
/// window.
pub struct TokenRefresher {
    codec: Arc<TokenCodec>,
    factory: AccessTokenBuilderFactory,
    strategy: Box<dyn RefreshStrategy>,
}

impl TokenRefresher {
    pub fn new(
        codec: Arc<TokenCodec>,
        factory: AccessTokenBuilderFactory,
        strategy: Box<dyn RefreshStrategy>,
    ) -> Self {
        Self {
            codec,
            factory,
            strategy,
        }
    }

    /// Builds a replacement for the given token, or `None` when the token is
    /// past its refresh window (the caller must re-authenticate) or the
    /// strategy says a refresh is not yet due. `None` is a normal negative
    /// result, not an error; signature failures still surface as errors.
    pub async fn refresh(&self, compact: &str) -> Result<Option<AccessToken>, AuthError> {
        let claims = self.codec.decode_expired_ok(compact).await?;
        let now = Utc::now();

        if !can_be_refreshed(&claims, now) {
            debug!(
                "token {} is past its refresh window, a new login is required",
                claims.jti
            );
            return Ok(None);
        }
        if !self.strategy.should_refresh(&claims, now) {
            return Ok(None);
        }

        debug!("refresh token {} for subject {}", claims.jti, claims.sub);
        let mut builder = self
            .factory
            .create(None)
            .subject(claims.sub.clone())
            .scope(claims.scope.clone())
            .groups(claims.groups.clone())
            .parent_key(claims.jti.clone());
        if let Some(issuer) = &claims.iss {
            builder = builder.issuer(issuer.clone());
        }
        for (key, value) in &claims.custom {
            builder = builder.custom(key.clone(), value.clone());
        }

        builder.build().await.map(Some)
    }
}

/// A token may be refreshed while it is still valid or still within its
/// refresh window.
pub(crate) fn can_be_refreshed(claims: &AccessTokenClaims, now: DateTime<Utc>) -> bool {
    let now = now.timestamp();
    now < claims.exp || claims.refresh_expiration.is_some_and(|until| now < until)
}

#[cfg(test)]
mod tests {
    use super::super::keys::{InMemoryKeyStore, SecureKeyResolver};
    use super::*;
    use crate::config::TokenConfig;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;
    use wildcard::Scope;

    fn claims_with(iat: i64, exp: i64, refresh_expiration: Option<i64>) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: "dent".to_string(),
            jti: "token-1".to_string(),
            iss: None,
            iat,
            exp,
            refresh_expiration,
            parent_token_id: "token-1".to_string(),
            scope: Scope::empty(),
            groups: Vec::new(),
            custom: BTreeMap::new(),
        }
    }

    struct AlwaysRefresh;

    impl RefreshStrategy for AlwaysRefresh {
        fn should_refresh(&self, _claims: &AccessTokenClaims, _now: DateTime<Utc>) -> bool {
            true
        }
    }

    fn refresher(strategy: Box<dyn RefreshStrategy>) -> (Arc<TokenCodec>, TokenRefresher) {
        let codec = Arc::new(TokenCodec::new(SecureKeyResolver::new(Arc::new(
            InMemoryKeyStore::new(),
        ))));
        let factory = AccessTokenBuilderFactory::new(
            Arc::clone(&codec),
            TokenConfig::default(),
            Vec::new(),
        );
        let refresher = TokenRefresher::new(Arc::clone(&codec), factory, strategy);
        (codec, refresher)
    }

    #[test]
    fn test_eligibility() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();

        // still valid
        assert!(can_be_refreshed(&claims_with(6000, 10_001, None), now));
        // expired but inside the refresh window
        assert!(can_be_refreshed(
            &claims_with(6000, 9_000, Some(20_000)),
            now
        ));
        // expired with no refresh window
        assert!(!can_be_refreshed(&claims_with(6000, 9_000, None), now));
        // expired and past the refresh window
        assert!(!can_be_refreshed(
            &claims_with(6000, 9_000, Some(10_000)),
            now
        ));
    }

    #[test]
    fn test_percentage_strategy_boundary_is_strict() {
        let strategy = PercentageRefreshStrategy::new(0.5);
        let claims = claims_with(0, 3600, None);

        // exactly at the threshold: not due
        let now = Utc.timestamp_opt(1800, 0).unwrap();
        assert!(!strategy.should_refresh(&claims, now));

        // one second past the threshold: due
        let now = Utc.timestamp_opt(1801, 0).unwrap();
        assert!(strategy.should_refresh(&claims, now));

        // age 31 min of a 1 h lifespan with threshold 0.5 is due
        let now = Utc.timestamp_opt(31 * 60, 0).unwrap();
        assert!(strategy.should_refresh(&claims, now));
    }

    #[tokio::test]
    async fn test_refresh_chains_lineage_and_copies_claims() {
        let (codec, refresher) = refresher(Box::new(AlwaysRefresh));

        let factory = AccessTokenBuilderFactory::new(
            Arc::clone(&codec),
            TokenConfig::default(),
            Vec::new(),
        );
        let old = factory
            .create(None)
            .subject("dent")
            .scope(Scope::new(["repository:read:42"]))
            .groups(["crew"])
            .custom("a", "b")
            .build()
            .await
            .expect("build failed");

        let refreshed = refresher
            .refresh(old.compact())
            .await
            .expect("refresh failed")
            .expect("token should be refreshed");

        let claims = refreshed.claims();
        assert_ne!(claims.jti, old.claims().jti);
        assert_eq!(claims.parent_token_id, old.claims().jti);
        assert_eq!(claims.sub, "dent");
        assert_eq!(claims.scope, old.claims().scope);
        assert_eq!(claims.groups, old.claims().groups);
        assert_eq!(claims.custom("a"), Some(&serde_json::json!("b")));
        assert!(claims.exp > claims.iat);

        // the replacement verifies like any fresh token
        let verified = codec
            .verify(refreshed.compact())
            .await
            .expect("verify failed");
        assert_eq!(&verified, claims);
    }

    #[tokio::test]
    async fn test_refresh_of_dead_token_returns_none() {
        let (codec, refresher) = refresher(Box::new(AlwaysRefresh));

        // already expired and not refreshable
        let now = Utc::now();
        let dead = claims_with(
            (now - Duration::hours(2)).timestamp(),
            (now - Duration::hours(1)).timestamp(),
            None,
        );
        let compact = codec.sign(&dead).await.expect("sign failed");

        let result = refresher.refresh(&compact).await.expect("refresh failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_refresh_not_due_returns_none() {
        struct NeverRefresh;

        impl RefreshStrategy for NeverRefresh {
            fn should_refresh(&self, _claims: &AccessTokenClaims, _now: DateTime<Utc>) -> bool {
                false
            }
        }

        let (codec, refresher) = refresher(Box::new(NeverRefresh));
        let factory = AccessTokenBuilderFactory::new(
            Arc::clone(&codec),
            TokenConfig::default(),
            Vec::new(),
        );
        let token = factory
            .create(None)
            .subject("dent")
            .build()
            .await
            .expect("build failed");

        let result = refresher
            .refresh(token.compact())
            .await
            .expect("refresh failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rejects_tampered_tokens() {
        let (codec, refresher) = refresher(Box::new(AlwaysRefresh));
        let factory = AccessTokenBuilderFactory::new(
            Arc::clone(&codec),
            TokenConfig::default(),
            Vec::new(),
        );
        let token = factory
            .create(None)
            .subject("dent")
            .build()
            .await
            .expect("build failed");

        let mut tampered = token.compact().to_string();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(
            refresher.refresh(&tampered).await,
            Err(AuthError::InvalidSignature)
        ));
    }
}
