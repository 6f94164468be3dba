//! Authorization collection, caching and scope application.

use crate::errors::AuthError;
use log::warn;
use std::collections::BTreeSet;
use wildcard::{Scope, WildcardPermission};

pub mod collector;
pub mod grants;

pub use collector::{AuthorizationCollector, CacheInvalidator};
pub use grants::SecuritySystem;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// The computed authorization of a principal: role names plus permission
/// strings. Equality covers both fields, so cached values compare whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationInfo {
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
}

impl AuthorizationInfo {
    pub fn new<R, P, S, T>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator<Item = S>,
        P: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True if any owned permission implies the required one.
    pub fn is_permitted(&self, required: &WildcardPermission) -> bool {
        self.permissions.iter().any(|owned| {
            match WildcardPermission::parse(owned) {
                Ok(owned) => owned.implies(required),
                Err(e) => {
                    warn!("skipping malformed owned permission \"{owned}\": {e}");
                    false
                }
            }
        })
    }

    /// Intersects this authorization with a token scope: every non-empty
    /// `limit` result of each owned permission against each scope entry.
    /// An empty scope imposes no restriction. Roles are identity, not
    /// privilege, and survive unchanged.
    ///
    /// Scope entries come out of a signed token, so a malformed entry is a
    /// claims failure, not a programming error.
    pub fn with_scope(&self, scope: &Scope) -> Result<AuthorizationInfo, AuthError> {
        if scope.is_empty() {
            return Ok(self.clone());
        }

        let mut limited = BTreeSet::new();
        for owned in &self.permissions {
            let parsed = match WildcardPermission::parse(owned) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping malformed owned permission \"{owned}\": {e}");
                    continue;
                }
            };
            let results = scope
                .limit(&parsed)
                .map_err(|e| AuthError::claims_invalid(format!("malformed scope entry: {e}")))?;
            for result in results {
                limited.insert(result.to_string());
            }
        }

        Ok(Self {
            roles: self.roles.clone(),
            permissions: limited,
        })
    }
}
