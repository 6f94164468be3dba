use crate::authz::{AuthorizationCollector, AuthorizationInfo, SecuritySystem};
use crate::cache::create_cache;
use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::errors::AuthError;
use crate::events::{AuthorizationChangedEventProducer, EventBus};
use crate::models::Principal;
use crate::stores::{GrantStore, GroupStore, PrincipalStore, RepositoryStore, StoreError};
use crate::throttle::LoginAttemptThrottle;
use crate::token::validator::run_chain;
use crate::token::{
    AccessToken, AccessTokenBuilder, AccessTokenBuilderFactory, AccessTokenClaims,
    AccessTokenEnricher, KeyStore, PercentageRefreshStrategy, SecureKeyResolver, TokenClaimsValidator,
    TokenCodec, TokenRefresher,
};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;
use wildcard::Scope;

/// The collaborator stores the core reads from, implemented elsewhere.
pub struct Collaborators {
    pub principals: Arc<dyn PrincipalStore>,
    pub groups: Arc<dyn GroupStore>,
    pub repositories: Arc<dyn RepositoryStore>,
    pub grants: Arc<dyn GrantStore>,
    pub keys: Arc<dyn KeyStore>,
}

/// A successfully verified bearer token: the authenticated principal, the
/// verified claims and the scope-limited effective authorization.
#[derive(Debug, Clone)]
pub struct VerifiedAccess {
    pub principal: Principal,
    pub claims: AccessTokenClaims,
    pub authorization: AuthorizationInfo,
}

/// Wires codec, builder, refresher, collector, grant management, throttle
/// and event subscriptions into the operations callers use.
pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    groups: Arc<dyn GroupStore>,
    codec: Arc<TokenCodec>,
    builder_factory: AccessTokenBuilderFactory,
    refresher: TokenRefresher,
    validators: Vec<Box<dyn TokenClaimsValidator>>,
    collector: Arc<AuthorizationCollector>,
    security: Arc<SecuritySystem>,
    throttle: LoginAttemptThrottle,
    bus: EventBus,
}

impl AuthService {
    /// Builds the service. The enricher and validator lists are closed here;
    /// nothing is discovered at runtime.
    pub fn new(
        config: AuthConfig,
        collaborators: Collaborators,
        enrichers: Vec<Box<dyn AccessTokenEnricher>>,
        validators: Vec<Box<dyn TokenClaimsValidator>>,
    ) -> Result<Self, String> {
        let resolver = SecureKeyResolver::new(collaborators.keys);
        let codec = Arc::new(TokenCodec::new(resolver));
        let builder_factory =
            AccessTokenBuilderFactory::new(Arc::clone(&codec), config.token.clone(), enrichers);
        let refresher = TokenRefresher::new(
            Arc::clone(&codec),
            builder_factory.clone(),
            Box::new(PercentageRefreshStrategy::new(config.token.refresh_threshold)),
        );

        let bus = EventBus::new();
        let security = Arc::new(SecuritySystem::new(collaborators.grants, bus.clone()));
        bus.subscribe(security.clone());

        let cache = create_cache(&config.cache)?;
        let collector = Arc::new(AuthorizationCollector::new(
            collaborators.repositories,
            Arc::clone(&security),
            cache,
        ));
        let producer = Arc::new(AuthorizationChangedEventProducer::new(vec![Arc::new(
            collector.invalidation_listener(),
        )]));
        bus.subscribe(producer);

        Ok(Self {
            principals: collaborators.principals,
            groups: collaborators.groups,
            codec,
            builder_factory,
            refresher,
            validators,
            collector,
            security,
            throttle: LoginAttemptThrottle::new(&config.throttle),
            bus,
        })
    }

    /// A builder for callers that need full control over token options.
    pub fn token_builder(&self, authenticated_caller: Option<&str>) -> AccessTokenBuilder {
        self.builder_factory.create(authenticated_caller)
    }

    /// Issues a token for an active principal, with the principal's groups
    /// stamped in and the given scope declared.
    pub async fn issue_token(&self, subject: &str, scope: Scope) -> Result<AccessToken, AuthError> {
        let principal = self.require_active_principal(subject).await?;
        let groups = self.groups_of(&principal.id).await?;
        self.builder_factory
            .create(None)
            .subject(principal.id)
            .scope(scope)
            .groups(groups)
            .build()
            .await
    }

    /// Verifies a bearer token and computes the effective authorization for
    /// the request: the subject's full permissions intersected with the
    /// token's declared scope.
    pub async fn verify_token(
        &self,
        compact: &str,
        context: &RequestContext,
    ) -> Result<VerifiedAccess, AuthError> {
        let claims = self.codec.verify(compact).await?;
        run_chain(&self.validators, &claims, context)?;

        let principal = self.require_active_principal(&claims.sub).await?;
        let groups: BTreeSet<String> = if claims.groups.is_empty() {
            self.groups_of(&principal.id).await?.into_iter().collect()
        } else {
            claims.groups.iter().cloned().collect()
        };

        let info = self.collector.collect(&principal, &groups).await?;
        let authorization = info.with_scope(&claims.scope)?;
        debug!("verified token {} for {}", claims.jti, principal.id);

        Ok(VerifiedAccess {
            principal,
            claims,
            authorization,
        })
    }

    /// Reissues an expiring token, or `None` when the caller has to
    /// re-authenticate or no refresh is due yet.
    pub async fn refresh_token(&self, compact: &str) -> Result<Option<AccessToken>, AuthError> {
        self.refresher.refresh(compact).await
    }

    /// Computes (or serves from cache) the authorization of a principal.
    pub async fn authorize(
        &self,
        principal: &Principal,
        groups: &BTreeSet<String>,
    ) -> Result<AuthorizationInfo, AuthError> {
        self.collector.collect(principal, groups).await
    }

    /// Fails with [`AuthError::AccountLocked`] while the principal is locked
    /// out.
    pub fn check_login_attempt(&self, principal: &str) -> Result<(), AuthError> {
        self.throttle.before_attempt(principal)
    }

    pub fn login_succeeded(&self, principal: &str) {
        self.throttle.on_success(principal);
    }

    pub fn login_failed(&self, principal: &str) {
        self.throttle.on_failure(principal);
    }

    /// The bus domain mutations must be published on for cache invalidation
    /// and grant cleanup to work.
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn security_system(&self) -> &Arc<SecuritySystem> {
        &self.security
    }

    /// The names of the groups the principal is a member of.
    pub async fn groups_of(&self, principal_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .groups
            .all_groups()
            .await?
            .into_iter()
            .filter(|group| group.members.contains(principal_id))
            .map(|group| group.name)
            .collect())
    }

    async fn require_active_principal(&self, id: &str) -> Result<Principal, AuthError> {
        let principal = self
            .principals
            .get(id)
            .await?
            .ok_or_else(|| AuthError::UnknownPrincipal(id.to_string()))?;
        if !principal.active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(principal)
    }
}
