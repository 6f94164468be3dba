use super::grants::SecuritySystem;
use super::{AuthorizationInfo, ROLE_ADMIN, ROLE_USER};
use crate::cache::{Cache, CacheBackend};
use crate::errors::AuthError;
use crate::events::{AuthorizationChange, AuthorizationChangeListener};
use crate::models::Principal;
use crate::stores::RepositoryStore;
use log::{info, trace};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Authorization cache key: one entry per principal and group combination,
/// so a membership change naturally misses the stale entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    principal_id: String,
    groups: BTreeSet<String>,
}

/// Computes the effective permission set for a principal from the global
/// grants and the per-repository grants, cached per principal.
pub struct AuthorizationCollector {
    repositories: Arc<dyn RepositoryStore>,
    security: Arc<SecuritySystem>,
    cache: Cache<CacheKey, AuthorizationInfo>,
}

impl AuthorizationCollector {
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        security: Arc<SecuritySystem>,
        cache: Cache<CacheKey, AuthorizationInfo>,
    ) -> Self {
        Self {
            repositories,
            security,
            cache,
        }
    }

    /// A listener that evicts this collector's cache entries; register it
    /// with the authorization changed event producer.
    pub fn invalidation_listener(&self) -> CacheInvalidator {
        CacheInvalidator {
            cache: self.cache.clone(),
        }
    }

    /// Computes or returns the cached [`AuthorizationInfo`] for the
    /// principal. A concurrent recompute for the same key is harmless: both
    /// runs produce an equal value and the last insert wins.
    pub async fn collect(
        &self,
        principal: &Principal,
        groups: &BTreeSet<String>,
    ) -> Result<AuthorizationInfo, AuthError> {
        let key = CacheKey {
            principal_id: principal.id.clone(),
            groups: groups.clone(),
        };

        if let Some(info) = self.cache.get(&key).await {
            trace!("retrieve authorization info for {} from cache", principal.id);
            return Ok(info);
        }

        trace!("collect authorization info for {}", principal.id);
        let info = self.create_authorization_info(principal, groups).await?;
        self.cache.insert(key, info.clone()).await;
        Ok(info)
    }

    async fn create_authorization_info(
        &self,
        principal: &Principal,
        groups: &BTreeSet<String>,
    ) -> Result<AuthorizationInfo, AuthError> {
        // admins own everything, per-object grants are never consulted
        if principal.admin {
            return Ok(AuthorizationInfo::new([ROLE_USER, ROLE_ADMIN], ["*"]));
        }

        let mut permissions: BTreeSet<String> = BTreeSet::new();

        for granted in self
            .security
            .permissions_matching(|p| subject_matches(principal, groups, &p.name, p.group_permission))
            .await?
        {
            trace!("add permission {} for {}", granted.permission, principal.id);
            permissions.insert(granted.permission);
        }

        for repository in self.repositories.all_repositories().await? {
            for grant in &repository.grants {
                if subject_matches(principal, groups, &grant.name, grant.group)
                    && !grant.verbs.is_empty()
                {
                    let permission =
                        format!("repository:{}:{}", grant.verbs.join(","), repository.id);
                    trace!("add permission {} for {}", permission, principal.id);
                    permissions.insert(permission);
                }
            }
        }

        // every principal may read itself and change its own password
        permissions.insert(format!("user:read:{}", principal.id));
        permissions.insert(format!("user:changePassword:{}", principal.id));

        Ok(AuthorizationInfo::new([ROLE_USER], permissions))
    }
}

fn subject_matches(
    principal: &Principal,
    groups: &BTreeSet<String>,
    name: &str,
    group: bool,
) -> bool {
    if group {
        groups.contains(name)
    } else {
        principal.id == name
    }
}

/// Evicts authorization cache entries in response to
/// [`AuthorizationChange`]s.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Cache<CacheKey, AuthorizationInfo>,
}

impl AuthorizationChangeListener for CacheInvalidator {
    fn authorization_changed(&self, change: &AuthorizationChange) {
        match change {
            AuthorizationChange::EveryUser => {
                info!("invalidate authorization cache, because of a received authorization event");
                self.cache.clear();
            }
            AuthorizationChange::User(id) => {
                info!(
                    "invalidate authorization cache for {}, because of a received authorization event",
                    id
                );
                let id = id.clone();
                self.cache
                    .remove_if(Box::new(move |key| key.principal_id.eq_ignore_ascii_case(&id)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::events::EventBus;
    use crate::models::{AssignedPermission, Repository, RepositoryGrant};
    use crate::test_utils::{MemoryGrantStore, MemoryRepositoryStore};

    fn groups<const N: usize>(names: [&str; N]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    struct Fixture {
        repositories: Arc<MemoryRepositoryStore>,
        grants: Arc<MemoryGrantStore>,
        collector: AuthorizationCollector,
    }

    fn fixture() -> Fixture {
        let repositories = Arc::new(MemoryRepositoryStore::new());
        let grants = Arc::new(MemoryGrantStore::new());
        let security = Arc::new(SecuritySystem::new(grants.clone(), EventBus::new()));
        let cache = crate::cache::create_cache(&CacheConfig::default())
            .expect("Failed to create cache");
        let collector = AuthorizationCollector::new(repositories.clone(), security, cache);
        Fixture {
            repositories,
            grants,
            collector,
        }
    }

    #[tokio::test]
    async fn test_admin_short_circuits_to_wildcard() {
        let f = fixture();
        // grant data that must never be consulted for admins
        f.repositories.insert(Repository::new("42", "hog")).await;

        let mut admin = Principal::new("marvin");
        admin.admin = true;

        let info = f
            .collector
            .collect(&admin, &groups([]))
            .await
            .expect("collect failed");
        assert!(info.has_role(ROLE_ADMIN));
        assert!(info.has_role(ROLE_USER));
        assert_eq!(info.permissions().iter().collect::<Vec<_>>(), vec!["*"]);
    }

    #[tokio::test]
    async fn test_collects_global_and_repository_permissions() {
        let f = fixture();

        let mut repository = Repository::new("42", "hog");
        repository.grants.push(RepositoryGrant::user("dent", ["read", "write"]));
        repository.grants.push(RepositoryGrant::group("crew", ["read"]));
        repository.grants.push(RepositoryGrant::user("trillian", ["read"]));
        f.repositories.insert(repository).await;

        f.grants
            .put_direct("1", AssignedPermission::user("dent", "repository:create"))
            .await;
        f.grants
            .put_direct("2", AssignedPermission::group("crew", "user:list"))
            .await;
        f.grants
            .put_direct("3", AssignedPermission::user("zaphod", "repository:create"))
            .await;

        let dent = Principal::new("dent");
        let info = f
            .collector
            .collect(&dent, &groups(["crew"]))
            .await
            .expect("collect failed");

        assert!(info.has_role(ROLE_USER));
        assert!(!info.has_role(ROLE_ADMIN));
        let expected: Vec<&str> = vec![
            "repository:create",
            "repository:read,write:42",
            "repository:read:42",
            "user:changePassword:dent",
            "user:list",
            "user:read:dent",
        ];
        assert_eq!(info.permissions().iter().collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_recomputation() {
        let f = fixture();
        let dent = Principal::new("dent");

        let first = f
            .collector
            .collect(&dent, &groups([]))
            .await
            .expect("collect failed");

        // mutate without firing events: the stale entry must be served
        f.grants
            .put_direct("1", AssignedPermission::user("dent", "repository:create"))
            .await;
        let second = f
            .collector
            .collect(&dent, &groups([]))
            .await
            .expect("collect failed");
        assert_eq!(first, second);

        // a different group set is a different cache key
        let recomputed = f
            .collector
            .collect(&dent, &groups(["crew"]))
            .await
            .expect("collect failed");
        assert!(recomputed.permissions().contains("repository:create"));
    }

    #[tokio::test]
    async fn test_invalidation_listener_evicts_single_principal() {
        let f = fixture();
        let dent = Principal::new("dent");
        let trillian = Principal::new("trillian");

        f.collector.collect(&dent, &groups([])).await.expect("collect failed");
        f.collector
            .collect(&trillian, &groups([]))
            .await
            .expect("collect failed");

        f.grants
            .put_direct("1", AssignedPermission::user("dent", "repository:create"))
            .await;
        f.collector
            .invalidation_listener()
            .authorization_changed(&AuthorizationChange::User("dent".to_string()));

        let info = f
            .collector
            .collect(&dent, &groups([]))
            .await
            .expect("collect failed");
        assert!(info.permissions().contains("repository:create"));
    }

    #[tokio::test]
    async fn test_invalidation_listener_clears_everything() {
        let f = fixture();
        let dent = Principal::new("dent");

        f.collector.collect(&dent, &groups([])).await.expect("collect failed");

        let mut repository = Repository::new("42", "hog");
        repository.grants.push(RepositoryGrant::user("dent", ["read"]));
        f.repositories.insert(repository).await;
        f.collector
            .invalidation_listener()
            .authorization_changed(&AuthorizationChange::EveryUser);

        let info = f
            .collector
            .collect(&dent, &groups([]))
            .await
            .expect("collect failed");
        assert!(info.permissions().contains("repository:read:42"));
    }
}
