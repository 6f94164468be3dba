use super::AuthorizationInfo;
use crate::errors::AuthError;
use crate::events::{Change, DomainEvent, EventBus, EventPhase, EventSubscriber};
use crate::models::AssignedPermission;
use crate::stores::{GrantStore, StoreError};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use log::{debug, warn};
use rand::Rng;
use std::sync::Arc;
use std::sync::LazyLock;
use wildcard::WildcardPermission;

/// The permission required to manage assigned permissions.
pub const ASSIGN_PERMISSION: &str = "permission:assign";

static ASSIGN: LazyLock<WildcardPermission> = LazyLock::new(|| {
    WildcardPermission::parse(ASSIGN_PERMISSION).expect("assign permission literal must parse")
});

/// Admin-gated management of global [`AssignedPermission`] grants.
///
/// Mutations are committed to the [`GrantStore`] first and then published on
/// the event bus, so subscribers always observe post-commit state.
pub struct SecuritySystem {
    store: Arc<dyn GrantStore>,
    bus: EventBus,
}

impl SecuritySystem {
    pub fn new(store: Arc<dyn GrantStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// Stores a new grant under a generated id and returns the id.
    pub async fn add(
        &self,
        actor: &AuthorizationInfo,
        permission: AssignedPermission,
    ) -> Result<String, AuthError> {
        self.ensure_assign_permitted(actor)?;
        validate_permission(&permission)?;

        let id = generate_grant_id();
        self.store.put(&id, permission.clone()).await?;
        debug!(
            "added permission {} for {} under id {}",
            permission.permission, permission.name, id
        );

        self.bus
            .publish(&DomainEvent::Grant {
                phase: EventPhase::Committed,
                change: Change::Created(permission),
            })
            .await;
        Ok(id)
    }

    /// Deletes the grant with the given id. Deleting an unknown id is a
    /// no-op.
    pub async fn delete(&self, actor: &AuthorizationInfo, id: &str) -> Result<(), AuthError> {
        self.ensure_assign_permitted(actor)?;

        let Some(permission) = self.find(id).await? else {
            return Ok(());
        };
        self.store.remove(id).await?;
        debug!(
            "deleted permission {} for {} under id {}",
            permission.permission, permission.name, id
        );

        self.bus
            .publish(&DomainEvent::Grant {
                phase: EventPhase::Committed,
                change: Change::Deleted(permission),
            })
            .await;
        Ok(())
    }

    /// Lists all grants with their ids.
    pub async fn assigned(
        &self,
        actor: &AuthorizationInfo,
    ) -> Result<Vec<(String, AssignedPermission)>, AuthError> {
        self.ensure_assign_permitted(actor)?;
        Ok(self.store.all().await?)
    }

    /// The grants matching a predicate; the collector's read path, not
    /// authorization gated.
    pub async fn permissions_matching<F>(
        &self,
        predicate: F,
    ) -> Result<Vec<AssignedPermission>, StoreError>
    where
        F: Fn(&AssignedPermission) -> bool,
    {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .map(|(_, permission)| permission)
            .filter(|permission| predicate(permission))
            .collect())
    }

    async fn find(&self, id: &str) -> Result<Option<AssignedPermission>, StoreError> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .find(|(stored_id, _)| stored_id == id)
            .map(|(_, permission)| permission))
    }

    fn ensure_assign_permitted(&self, actor: &AuthorizationInfo) -> Result<(), AuthError> {
        if actor.is_permitted(&ASSIGN) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(ASSIGN_PERMISSION.to_string()))
        }
    }

    /// Removes every grant of a deleted subject, without firing grant
    /// events: the triggering deletion event already covers invalidation.
    async fn remove_grants_of(&self, name: &str, group: bool) -> Result<(), StoreError> {
        for (id, permission) in self.store.all().await? {
            if permission.group_permission == group && permission.name == name {
                debug!(
                    "remove orphaned permission {} of deleted {} {}",
                    permission.permission,
                    if group { "group" } else { "user" },
                    name
                );
                self.store.remove(&id).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for SecuritySystem {
    async fn on_event(&self, event: &DomainEvent) {
        let result = match event {
            DomainEvent::Principal {
                phase: EventPhase::Committed,
                change: Change::Deleted(principal),
            } => self.remove_grants_of(&principal.id, false).await,
            DomainEvent::Group {
                phase: EventPhase::Committed,
                change: Change::Deleted(group),
            } => self.remove_grants_of(&group.name, true).await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!("failed to remove grants of deleted subject: {e}");
        }
    }
}

fn validate_permission(permission: &AssignedPermission) -> Result<(), AuthError> {
    if permission.name.trim().is_empty() {
        return Err(AuthError::invalid_argument("grant name must not be empty"));
    }
    WildcardPermission::parse(&permission.permission)
        .map_err(|e| AuthError::invalid_argument(format!("malformed permission: {e}")))?;
    Ok(())
}

/// Random 96-bit identifier, base64url encoded.
fn generate_grant_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..12).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
