//! Hosted Backend Abstraction
//!
//! Row lookups, the permission RPC, the append-only audit insert and the
//! authenticated-user accessor live behind these traits. The portal never
//! assumes anything about how they are served.

use crate::audit::{AuditQuery, AuditRecord};
use crate::model::{Account, ActorId, ClientConfig, CrmClient, Role, Setting, SettingStatus, Sid};
use async_trait::async_trait;

/// Backend result type
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("denied by row policy: {0}")]
    Denied(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Authenticated-user accessor
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current signed-in actor, if any
    async fn current_actor(&self) -> BackendResult<Option<ActorId>>;
}

/// Identity fixed for the lifetime of one request or session
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentity(Option<ActorId>);

impl StaticIdentity {
    pub fn signed_in(actor: ActorId) -> Self {
        Self(Some(actor))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_actor(&self) -> BackendResult<Option<ActorId>> {
        Ok(self.0)
    }
}

/// Account directory: settings, SID links, roles and permissions
#[async_trait]
pub trait AccessDirectory: Send + Sync {
    /// Whether a `sid_lookup` row links `sid` to `actor`
    async fn is_linked(&self, sid: &Sid, actor: ActorId) -> BackendResult<bool>;

    /// Status column of the settings row, `None` when no row exists
    async fn setting_status(&self, sid: &Sid) -> BackendResult<Option<SettingStatus>>;

    /// Settings row as visible to the caller
    async fn setting(&self, sid: &Sid) -> BackendResult<Option<Setting>>;

    /// All settings rows ordered by account name
    async fn settings(&self) -> BackendResult<Vec<Setting>>;

    /// SIDs linked to `actor`
    async fn linked_sids(&self, actor: ActorId) -> BackendResult<Vec<Sid>>;

    /// CRM row for `sid`
    async fn crm_client(&self, sid: &Sid) -> BackendResult<Option<CrmClient>>;

    /// Update the package on the settings row and CRM row together
    async fn update_package(&self, sid: &Sid, package: &str) -> BackendResult<()>;

    /// Role row for `actor`
    async fn role_of(&self, actor: ActorId) -> BackendResult<Option<Role>>;

    /// Permission RPC for client users
    async fn check_permission(&self, actor: ActorId, resource: &str, action: &str) -> BackendResult<bool>;

    /// Look up an account by email for sign-in
    async fn account_by_email(&self, email: &str) -> BackendResult<Option<Account>>;

    /// Stored client preferences
    async fn client_config(&self, sid: &Sid) -> BackendResult<Option<ClientConfig>>;

    /// Upsert client preferences
    async fn save_client_config(&self, sid: &Sid, config: &ClientConfig) -> BackendResult<()>;
}

/// Append-only audit store
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one record
    async fn append(&self, record: AuditRecord) -> BackendResult<()>;

    /// Records matching `query`, newest first
    async fn query(&self, query: &AuditQuery) -> BackendResult<Vec<AuditRecord>>;
}
