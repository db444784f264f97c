//! Shared application state

use crate::auth::AuthUser;
use crate::config::PortalConfig;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use portal_access::{
    AccessControl, AccessServices, AuditLogger, IdentityProvider, MemorySessionStorage, StaticIdentity,
    TenantContextStore, Validator,
};
use portal_campaigns::{CampaignRepository, CampaignService};
use portal_projects::{ProjectRepository, ProjectTracker};
use std::sync::Arc;
use uuid::Uuid;

/// Per-session tenant context storage, dropped at logout or expiry
struct Session {
    expires_at: DateTime<Utc>,
    storage: Arc<MemorySessionStorage>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub services: AccessServices,
    pub projects: Arc<dyn ProjectRepository>,
    pub campaigns: Arc<dyn CampaignRepository>,
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl AppState {
    pub fn new(
        config: PortalConfig,
        services: AccessServices,
        projects: Arc<dyn ProjectRepository>,
        campaigns: Arc<dyn CampaignRepository>,
    ) -> Self {
        let services = services
            .with_runtime(config.runtime)
            .with_validator_config(config.validator.clone());
        Self {
            config: Arc::new(config),
            services,
            projects,
            campaigns,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Open a session valid until `expires_at`, sweeping expired ones first
    pub fn open_session(&self, expires_at: DateTime<Utc>) -> Uuid {
        self.sweep_sessions();
        let session_id = Uuid::new_v4();
        self.sessions.insert(
            session_id,
            Session {
                expires_at,
                storage: Arc::new(MemorySessionStorage::new()),
            },
        );
        session_id
    }

    pub fn close_session(&self, session_id: Uuid) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    pub fn has_session(&self, session_id: Uuid) -> bool {
        self.live_storage(session_id).is_some()
    }

    /// Drop every expired session along with its tenant context
    fn sweep_sessions(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live(now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, "expired sessions swept");
        }
        removed
    }

    fn live_storage(&self, session_id: Uuid) -> Option<Arc<MemorySessionStorage>> {
        let now = Utc::now();
        let storage = self
            .sessions
            .get(&session_id)
            .map(|session| (session.is_live(now), session.storage.clone()));
        match storage {
            Some((true, storage)) => Some(storage),
            Some((false, _)) => {
                self.sessions.remove_if(&session_id, |_, session| !session.is_live(now));
                None
            }
            None => None,
        }
    }

    fn identity(user: Option<&AuthUser>) -> Arc<dyn IdentityProvider> {
        match user {
            Some(user) => Arc::new(StaticIdentity::signed_in(user.actor)),
            None => Arc::new(StaticIdentity::anonymous()),
        }
    }

    pub fn audit(&self, user: Option<&AuthUser>) -> AuditLogger {
        self.services.audit_for(Self::identity(user))
    }

    pub fn validator(&self, user: &AuthUser) -> Validator {
        self.services.validator_for(Self::identity(Some(user)))
    }

    /// Tenant context bound to the caller's session storage
    pub fn context(&self, user: &AuthUser) -> Result<TenantContextStore, ApiError> {
        let storage = self.live_storage(user.session_id).ok_or(ApiError::Unauthorized)?;
        Ok(self.services.context_for(Self::identity(Some(user)), storage))
    }

    pub fn tracker(&self, user: &AuthUser) -> ProjectTracker {
        ProjectTracker::new(self.projects.clone(), self.audit(Some(user)))
    }

    pub fn campaign_service(&self, user: &AuthUser) -> CampaignService {
        CampaignService::new(self.campaigns.clone(), self.audit(Some(user)))
    }

    pub fn access(&self) -> AccessControl {
        self.services.access_control()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use portal_access::{InMemoryBackend, Role};
    use portal_campaigns::InMemoryCampaignRepository;
    use portal_projects::InMemoryProjectRepository;

    fn state() -> AppState {
        let backend = Arc::new(InMemoryBackend::new());
        AppState::new(
            PortalConfig::default(),
            AccessServices::new(backend.clone(), backend),
            Arc::new(InMemoryProjectRepository::standard()),
            Arc::new(InMemoryCampaignRepository::new()),
        )
    }

    fn user(session_id: Uuid) -> AuthUser {
        AuthUser {
            actor: Uuid::new_v4(),
            session_id,
            email: "owner@example.com".into(),
            role: Role::Client,
        }
    }

    #[test]
    fn test_expired_session_is_rejected_and_dropped() {
        let state = state();
        let expired = state.open_session(Utc::now() - Duration::minutes(1));
        assert_eq!(state.sessions.len(), 1);

        assert!(!state.has_session(expired));
        assert!(state.sessions.is_empty());
        assert!(matches!(state.context(&user(expired)), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_login_sweeps_expired_sessions() {
        let state = state();
        state.open_session(Utc::now() - Duration::minutes(5));
        state.open_session(Utc::now() - Duration::minutes(1));

        let live = state.open_session(Utc::now() + Duration::hours(1));
        assert_eq!(state.sessions.len(), 1);
        assert!(state.has_session(live));
        assert!(state.context(&user(live)).is_ok());
    }

    #[test]
    fn test_closed_session_is_not_recreated() {
        let state = state();
        let session = state.open_session(Utc::now() + Duration::hours(1));
        assert!(state.close_session(session));

        assert!(matches!(state.context(&user(session)), Err(ApiError::Unauthorized)));
        assert!(!state.has_session(session));
        assert!(state.sessions.is_empty());
    }
}
