//! Collaborator interfaces consumed by the core and implemented elsewhere.
//!
//! These are treated as opaque synchronous data-access calls; timeouts and
//! retries are the collaborator's concern. Failures propagate unchanged
//! through [`StoreError`] since the core has no compensating action.

use crate::models::{AssignedPermission, Group, Principal, Repository};
use async_trait::async_trait;
use thiserror::Error;

/// Opaque failure of a collaborator store.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Principal>, StoreError>;

    async fn update(&self, principal: Principal) -> Result<(), StoreError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn all_groups(&self) -> Result<Vec<Group>, StoreError>;
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn all_repositories(&self) -> Result<Vec<Repository>, StoreError>;
}

/// Keyed storage for [`AssignedPermission`] entries. Authorization gating
/// happens in [`crate::authz::SecuritySystem`], not here.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn put(&self, id: &str, permission: AssignedPermission) -> Result<(), StoreError>;

    async fn remove(&self, id: &str) -> Result<(), StoreError>;

    async fn all(&self) -> Result<Vec<(String, AssignedPermission)>, StoreError>;
}
