//! Receives all kinds of events which affect authorization relevant data and
//! notifies the registered listeners when authorization data has changed.

use super::{Change, DomainEvent, EventSubscriber};
use crate::models::{AssignedPermission, Group, Principal, Repository};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// The portion of the authorization cache affected by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationChange {
    /// Repository and group mutations can affect an unbounded set of
    /// principals, so everything must go.
    EveryUser,
    /// Only the named principal's entries are affected.
    User(String),
}

pub trait AuthorizationChangeListener: Send + Sync {
    fn authorization_changed(&self, change: &AuthorizationChange);
}

/// Translates committed domain mutations into [`AuthorizationChange`]s.
///
/// The listener list is fixed at construction. Group membership fan-out is
/// deliberately not tracked: a group-level mutation falls back to clearing
/// everything, which is coarse but always correct.
pub struct AuthorizationChangedEventProducer {
    listeners: Vec<Arc<dyn AuthorizationChangeListener>>,
}

impl AuthorizationChangedEventProducer {
    pub fn new(listeners: Vec<Arc<dyn AuthorizationChangeListener>>) -> Self {
        Self { listeners }
    }

    /// Maps a domain event to the cache regions it invalidates, if any.
    /// Pre-commit events never invalidate.
    fn translate(event: &DomainEvent) -> Option<AuthorizationChange> {
        if !event.committed() {
            return None;
        }

        match event {
            DomainEvent::Principal { change, .. } => Self::translate_principal(change),
            DomainEvent::Group { change, .. } => Self::translate_group(change),
            DomainEvent::Repository { change, .. } => Self::translate_repository(change),
            DomainEvent::Grant { change, .. } => Some(Self::translate_grant(change.item())),
        }
    }

    fn translate_principal(change: &Change<Principal>) -> Option<AuthorizationChange> {
        match change {
            // created covers stale entries from an earlier principal with
            // the same id
            Change::Created(principal) | Change::Deleted(principal) => {
                Some(AuthorizationChange::User(principal.id.clone()))
            }
            Change::Modified { current, before } => {
                if current.active != before.active || current.admin != before.admin {
                    Some(AuthorizationChange::User(current.id.clone()))
                } else {
                    debug!(
                        "no authorization change for principal {}, no relevant field changed",
                        current.id
                    );
                    None
                }
            }
        }
    }

    fn translate_group(change: &Change<Group>) -> Option<AuthorizationChange> {
        match change {
            Change::Created(_) | Change::Deleted(_) => Some(AuthorizationChange::EveryUser),
            Change::Modified { current, before } => {
                if current.members != before.members {
                    Some(AuthorizationChange::EveryUser)
                } else {
                    debug!(
                        "no authorization change for group {}, members unchanged",
                        current.name
                    );
                    None
                }
            }
        }
    }

    fn translate_repository(change: &Change<Repository>) -> Option<AuthorizationChange> {
        match change {
            Change::Created(_) | Change::Deleted(_) => Some(AuthorizationChange::EveryUser),
            Change::Modified { current, before } => {
                if Self::repository_authorization_changed(current, before) {
                    Some(AuthorizationChange::EveryUser)
                } else {
                    debug!(
                        "no authorization change for repository {}, no relevant field changed",
                        current.id
                    );
                    None
                }
            }
        }
    }

    fn repository_authorization_changed(current: &Repository, before: &Repository) -> bool {
        current.archived != before.archived
            || current.public_readable != before.public_readable
            || !Self::same_grants(current, before)
    }

    // set comparison, a reordered grant list is not a change
    fn same_grants(current: &Repository, before: &Repository) -> bool {
        current.grants.iter().all(|g| before.grants.contains(g))
            && before.grants.iter().all(|g| current.grants.contains(g))
    }

    fn translate_grant(permission: &AssignedPermission) -> AuthorizationChange {
        if permission.group_permission {
            AuthorizationChange::EveryUser
        } else {
            AuthorizationChange::User(permission.name.clone())
        }
    }

    fn notify(&self, change: AuthorizationChange) {
        debug!("fire authorization changed notification: {:?}", change);
        for listener in &self.listeners {
            listener.authorization_changed(&change);
        }
    }
}

#[async_trait]
impl EventSubscriber for AuthorizationChangedEventProducer {
    async fn on_event(&self, event: &DomainEvent) {
        if let Some(change) = Self::translate(event) {
            self.notify(change);
        }
    }
}
