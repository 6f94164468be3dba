use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An identity known to the server.
///
/// Group membership is not embedded; it is computed by the group
/// collaborator. The core only reads principals and, for flag
/// synchronization, requests updates through the [`crate::stores::PrincipalStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier, also the login name.
    pub id: String,
    pub display_name: String,
    pub active: bool,
    pub admin: bool,
}

impl Principal {
    pub fn new<S: Into<String>>(id: S) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            active: true,
            admin: false,
        }
    }
}

/// A named set of member principals, read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub members: BTreeSet<String>,
}

impl Group {
    pub fn new<S, I, M>(name: S, members: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// A hosted repository together with its permission grants.
///
/// The `archived` and `public_readable` flags carry no verbs themselves, but
/// changes to them are authorization relevant and drive cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub archived: bool,
    pub public_readable: bool,
    pub grants: Vec<RepositoryGrant>,
}

impl Repository {
    pub fn new<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            archived: false,
            public_readable: false,
            grants: Vec::new(),
        }
    }
}

/// A permission grant attached to a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryGrant {
    /// Principal id or group name the grant applies to.
    pub name: String,
    /// Whether `name` refers to a group.
    pub group: bool,
    /// Granted verbs, rendered into `repository:<verbs>:<id>`.
    pub verbs: Vec<String>,
}

impl RepositoryGrant {
    pub fn user<S: Into<String>, I: IntoIterator<Item = S>>(name: S, verbs: I) -> Self {
        Self {
            name: name.into(),
            group: false,
            verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn group<S: Into<String>, I: IntoIterator<Item = S>>(name: S, verbs: I) -> Self {
        Self {
            name: name.into(),
            group: true,
            verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }
}

/// A durable, admin-managed assignment of a permission string to a user or
/// group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPermission {
    /// Principal id or group name the permission is assigned to.
    pub name: String,
    /// Whether `name` refers to a group.
    pub group_permission: bool,
    /// The permission string, e.g. `repository:create`.
    pub permission: String,
}

impl AssignedPermission {
    pub fn user<S: Into<String>>(name: S, permission: S) -> Self {
        Self {
            name: name.into(),
            group_permission: false,
            permission: permission.into(),
        }
    }

    pub fn group<S: Into<String>>(name: S, permission: S) -> Self {
        Self {
            name: name.into(),
            group_permission: true,
            permission: permission.into(),
        }
    }
}
