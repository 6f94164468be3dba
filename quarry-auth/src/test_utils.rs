//! In-memory collaborator implementations and a wired service fixture for
//! tests.

use crate::config::{AuthConfig, ThrottleConfig};
use crate::models::{AssignedPermission, Group, Principal, Repository};
use crate::service::{AuthService, Collaborators};
use crate::stores::{GrantStore, GroupStore, PrincipalStore, RepositoryStore, StoreError};
use crate::token::{AccessTokenEnricher, InMemoryKeyStore, TokenClaimsValidator};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub(crate) struct MemoryPrincipalStore {
    principals: DashMap<String, Principal>,
}

impl MemoryPrincipalStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, principal: Principal) {
        self.principals.insert(principal.id.clone(), principal);
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn get(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.get(id).map(|entry| entry.clone()))
    }

    async fn update(&self, principal: Principal) -> Result<(), StoreError> {
        self.principals.insert(principal.id.clone(), principal);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryGroupStore {
    groups: RwLock<Vec<Group>>,
}

impl MemoryGroupStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, group: Group) {
        self.groups.write().unwrap().push(group);
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn all_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups.read().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct MemoryRepositoryStore {
    repositories: RwLock<Vec<Repository>>,
}

impl MemoryRepositoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, repository: Repository) {
        self.repositories.write().unwrap().push(repository);
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn all_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        Ok(self.repositories.read().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct MemoryGrantStore {
    grants: DashMap<String, AssignedPermission>,
}

impl MemoryGrantStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores a grant directly, bypassing the security system and its
    /// events.
    pub(crate) async fn put_direct(&self, id: &str, permission: AssignedPermission) {
        self.grants.insert(id.to_string(), permission);
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn put(&self, id: &str, permission: AssignedPermission) -> Result<(), StoreError> {
        self.grants.insert(id.to_string(), permission);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.grants.remove(id);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<(String, AssignedPermission)>, StoreError> {
        let mut grants: Vec<(String, AssignedPermission)> = self
            .grants
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        grants.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(grants)
    }
}

/// A fully wired [`AuthService`] over in-memory collaborators.
pub(crate) struct TestFixture {
    pub(crate) service: AuthService,
    pub(crate) principals: Arc<MemoryPrincipalStore>,
    pub(crate) groups: Arc<MemoryGroupStore>,
    pub(crate) repositories: Arc<MemoryRepositoryStore>,
    pub(crate) grants: Arc<MemoryGrantStore>,
}

impl TestFixture {
    pub(crate) const THROTTLE_LIMIT: i64 = 3;

    pub(crate) async fn new() -> Self {
        Self::with_components(Vec::new(), Vec::new()).await
    }

    pub(crate) async fn with_components(
        enrichers: Vec<Box<dyn AccessTokenEnricher>>,
        validators: Vec<Box<dyn TokenClaimsValidator>>,
    ) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let principals = Arc::new(MemoryPrincipalStore::new());
        let groups = Arc::new(MemoryGroupStore::new());
        let repositories = Arc::new(MemoryRepositoryStore::new());
        let grants = Arc::new(MemoryGrantStore::new());

        let config = AuthConfig {
            throttle: ThrottleConfig {
                limit: Self::THROTTLE_LIMIT,
                timeout_secs: 300,
            },
            ..Default::default()
        };
        let collaborators = Collaborators {
            principals: principals.clone(),
            groups: groups.clone(),
            repositories: repositories.clone(),
            grants: grants.clone(),
            keys: Arc::new(InMemoryKeyStore::new()),
        };
        let service = AuthService::new(config, collaborators, enrichers, validators)
            .expect("Failed to create auth service");

        Self {
            service,
            principals,
            groups,
            repositories,
            grants,
        }
    }

    pub(crate) async fn add_principal(&self, principal: Principal) {
        self.principals.insert(principal).await;
    }

    pub(crate) async fn update_principal(&self, principal: Principal) {
        self.principals.insert(principal).await;
    }

    pub(crate) async fn add_group(&self, group: Group) {
        self.groups.insert(group).await;
    }

    pub(crate) async fn add_repository(&self, repository: Repository) {
        self.repositories.insert(repository).await;
    }
}
