use super::codec::TokenCodec;
use super::{AccessToken, AccessTokenClaims};
use crate::config::TokenConfig;
use crate::errors::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use log::debug;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs before signing and may add further custom claims to the builder.
///
/// Enrichers must be idempotent and free of side effects on anything but
/// the builder they are handed.
pub trait AccessTokenEnricher: Send + Sync {
    fn enrich(&self, builder: &mut AccessTokenBuilder);
}

/// Creates [`AccessTokenBuilder`]s wired with the codec, the configured
/// defaults and the enricher list, which is closed at startup.
#[derive(Clone)]
pub struct AccessTokenBuilderFactory {
    codec: Arc<TokenCodec>,
    config: TokenConfig,
    enrichers: Arc<Vec<Box<dyn AccessTokenEnricher>>>,
}

impl AccessTokenBuilderFactory {
    pub fn new(
        codec: Arc<TokenCodec>,
        config: TokenConfig,
        enrichers: Vec<Box<dyn AccessTokenEnricher>>,
    ) -> Self {
        Self {
            codec,
            config,
            enrichers: Arc::new(enrichers),
        }
    }

    /// Creates a builder. `authenticated_caller` is the explicit ambient
    /// identity used when no subject is set on the builder; building without
    /// either fails with [`AuthError::NotAuthenticated`].
    pub fn create(&self, authenticated_caller: Option<&str>) -> AccessTokenBuilder {
        AccessTokenBuilder {
            codec: Arc::clone(&self.codec),
            enrichers: Arc::clone(&self.enrichers),
            authenticated_caller: authenticated_caller.map(str::to_string),
            issuer: self.config.issuer.clone(),
            subject: None,
            expires_in: Duration::seconds(self.config.expires_in_secs),
            refreshable_for: Duration::seconds(self.config.refreshable_for_secs),
            scope: wildcard::Scope::empty(),
            groups: Vec::new(),
            custom: BTreeMap::new(),
            parent_key: None,
        }
    }
}

/// Assembles and signs an [`AccessToken`]. Options may be set in any order;
/// validation happens in [`AccessTokenBuilder::build`].
pub struct AccessTokenBuilder {
    codec: Arc<TokenCodec>,
    enrichers: Arc<Vec<Box<dyn AccessTokenEnricher>>>,
    authenticated_caller: Option<String>,
    subject: Option<String>,
    issuer: Option<String>,
    expires_in: Duration,
    refreshable_for: Duration,
    scope: wildcard::Scope,
    groups: Vec<String>,
    custom: BTreeMap<String, serde_json::Value>,
    parent_key: Option<String>,
}

impl AccessTokenBuilder {
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn issuer<S: Into<String>>(mut self, issuer: S) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = duration;
        self
    }

    /// Sets the refresh window. A zero duration disables refreshability.
    pub fn refreshable_for(mut self, duration: Duration) -> Self {
        self.refreshable_for = duration;
        self
    }

    pub fn scope(mut self, scope: wildcard::Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn groups<S: Into<String>, I: IntoIterator<Item = S>>(mut self, groups: I) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom<K: Into<String>, V: Into<serde_json::Value>>(mut self, key: K, value: V) -> Self {
        self.add_custom(key, value);
        self
    }

    /// Overrides the parent token id; used by the refresher to chain
    /// lineage.
    pub fn parent_key<S: Into<String>>(mut self, parent_key: S) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// In-place variant of [`AccessTokenBuilder::custom`] for enrichers.
    pub fn add_custom<K: Into<String>, V: Into<serde_json::Value>>(&mut self, key: K, value: V) {
        self.custom.insert(key.into(), value.into());
    }

    pub fn has_custom(&self, key: &str) -> bool {
        self.custom.contains_key(key)
    }

    /// Stamps id, timestamps and lineage, runs the enrichers and signs.
    pub async fn build(mut self) -> Result<AccessToken, AuthError> {
        let enrichers = Arc::clone(&self.enrichers);
        for enricher in enrichers.iter() {
            enricher.enrich(&mut self);
        }

        let subject = self
            .subject
            .take()
            .or(self.authenticated_caller.take())
            .ok_or(AuthError::NotAuthenticated)?;
        self.validate()?;

        let id = generate_token_id();
        let now = Utc::now();
        let expires_at = now + self.expires_in;
        let refresh_expiration = if self.refreshable_for.is_zero() {
            None
        } else {
            Some((now + self.refreshable_for).timestamp())
        };

        let claims = AccessTokenClaims {
            sub: subject,
            parent_token_id: self.parent_key.take().unwrap_or_else(|| id.clone()),
            jti: id,
            iss: self.issuer.take(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            refresh_expiration,
            scope: std::mem::take(&mut self.scope),
            groups: std::mem::take(&mut self.groups),
            custom: std::mem::take(&mut self.custom),
        };
        debug!("build access token {} for subject {}", claims.jti, claims.sub);

        let compact = self.codec.sign(&claims).await?;
        Ok(AccessToken::new(claims, compact))
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.expires_in <= Duration::zero() {
            return Err(AuthError::invalid_argument(
                "token lifetime must be positive",
            ));
        }
        if self.refreshable_for < Duration::zero() {
            return Err(AuthError::invalid_argument(
                "refresh window must not be negative",
            ));
        }
        for (key, value) in &self.custom {
            if key.trim().is_empty() {
                return Err(AuthError::invalid_argument(
                    "custom claim key must not be empty",
                ));
            }
            let empty = match value {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.is_empty(),
                _ => false,
            };
            if empty {
                return Err(AuthError::invalid_argument(format!(
                    "custom claim \"{key}\" must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Random 128-bit identifier, base64url encoded.
fn generate_token_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
