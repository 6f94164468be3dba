//! # quarry-auth
//!
//! The authentication and authorization core of the Quarry repository
//! server: it decides who a caller is and what that caller may do.
//!
//! ## Components
//!
//! - **Token:** signed HS256 bearer tokens with per-subject keys, a fluent
//!   builder with pluggable enrichers, refresh with lineage tracking, and a
//!   post-decode claims validator chain.
//! - **Authorization:** the effective permission set of a principal,
//!   computed from global and per-repository grants, cached per principal
//!   and invalidated precisely by domain mutation events.
//! - **Scope:** wildcard permission intersection (via the `wildcard`
//!   crate), so a token can carry strictly less privilege than its subject.
//! - **Throttle:** a concurrent per-principal login attempt counter with
//!   temporary lockout.
//!
//! The HTTP layer, credential checks and the user/group/repository stores
//! are external collaborators behind the traits in [`stores`].

pub mod authz;
pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod models;
pub mod service;
pub mod stores;
pub mod throttle;
pub mod token;

#[cfg(test)]
pub(crate) mod test_utils;

pub use authz::{AuthorizationCollector, AuthorizationInfo, SecuritySystem, ROLE_ADMIN, ROLE_USER};
pub use config::AuthConfig;
pub use context::RequestContext;
pub use errors::AuthError;
pub use events::{DomainEvent, EventBus};
pub use models::{AssignedPermission, Group, Principal, Repository, RepositoryGrant};
pub use service::{AuthService, Collaborators, VerifiedAccess};
pub use throttle::LoginAttemptThrottle;
pub use token::{
    AccessToken, AccessTokenBuilder, AccessTokenBuilderFactory, AccessTokenClaims, TokenCodec,
    TokenRefresher,
};
pub use wildcard::{Scope, WildcardPermission};
