//! Signed access token lifecycle: keys, codec, builder, refresh and
//! post-decode claim validation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wildcard::Scope;

pub mod builder;
pub mod codec;
pub mod keys;
pub mod refresh;
pub mod validator;
pub mod xsrf;

pub use builder::{AccessTokenBuilder, AccessTokenBuilderFactory, AccessTokenEnricher};
pub use codec::TokenCodec;
pub use keys::{InMemoryKeyStore, KeyStore, SecureKey, SecureKeyResolver};
pub use refresh::{PercentageRefreshStrategy, RefreshStrategy, TokenRefresher};
pub use validator::TokenClaimsValidator;
pub use xsrf::{XsrfClaimsValidator, XsrfTokenEnricher};

/// The claim set carried by an access token.
///
/// Instances are immutable once built; a refresh produces a new claim set
/// with a fresh id whose `parentTokenId` points at the refreshed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// The principal the token was issued for.
    pub sub: String,
    /// Unique token id.
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiration, seconds since the epoch. Always greater than `iat`.
    pub exp: i64,
    /// End of the refresh window; absent when the token is not refreshable.
    #[serde(rename = "refreshExpiration", skip_serializing_if = "Option::is_none")]
    pub refresh_expiration: Option<i64>,
    /// Refresh lineage: the id of the token this one was refreshed from, or
    /// the token's own id for a freshly built token.
    #[serde(rename = "parentTokenId")]
    pub parent_token_id: String,
    /// Declared permission scope; empty means the token carries the
    /// subject's full authorization.
    #[serde(default, skip_serializing_if = "Scope::is_empty")]
    pub scope: Scope,
    /// Group override list; empty means groups are resolved at
    /// verification time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Custom claims added by callers and enrichers.
    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl AccessTokenClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }

    pub fn refreshable_until(&self) -> Option<DateTime<Utc>> {
        self.refresh_expiration
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn custom(&self, key: &str) -> Option<&serde_json::Value> {
        self.custom.get(key)
    }
}

/// A built and signed access token: the claim set plus its compact
/// serialized form.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    claims: AccessTokenClaims,
    compact: String,
}

impl AccessToken {
    pub(crate) fn new(claims: AccessTokenClaims, compact: String) -> Self {
        Self { claims, compact }
    }

    pub fn claims(&self) -> &AccessTokenClaims {
        &self.claims
    }

    /// The signed `header.payload.signature` string.
    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn id(&self) -> &str {
        &self.claims.jti
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}
