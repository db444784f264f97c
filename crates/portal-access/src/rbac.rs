//! Role-based access checks

use crate::backend::AccessDirectory;
use crate::model::{ActorId, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Protected resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Settings,
    ClientSettings,
    Project2025,
    Campaigns,
    AuditLog,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::ClientSettings => "client_settings",
            Self::Project2025 => "project_2025",
            Self::Campaigns => "campaigns",
            Self::AuditLog => "access_log",
        }
    }
}

/// Operation on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Access control over the directory's roles and permission RPC
#[derive(Clone)]
pub struct AccessControl {
    directory: Arc<dyn AccessDirectory>,
}

impl AccessControl {
    pub fn new(directory: Arc<dyn AccessDirectory>) -> Self {
        Self { directory }
    }

    /// Role of `actor`, `None` when unknown or the lookup fails
    pub async fn role_of(&self, actor: ActorId) -> Option<Role> {
        match self.directory.role_of(actor).await {
            Ok(role) => role,
            Err(e) => {
                tracing::error!(actor = %actor, error = %e, "Error checking user role");
                None
            }
        }
    }

    pub async fn is_agency(&self, actor: ActorId) -> bool {
        self.role_of(actor).await == Some(Role::Agency)
    }

    /// Agency users have full access; client users go through the permission check
    pub async fn check_access(&self, actor: Option<ActorId>, resource: Resource, op: Operation) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        if self.is_agency(actor).await {
            return true;
        }

        match self
            .directory
            .check_permission(actor, resource.as_str(), op.as_str())
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::error!(actor = %actor, resource = resource.as_str(), error = %e, "Error checking permission");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Faults, InMemoryBackend};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_agency_has_full_access() {
        let backend = Arc::new(InMemoryBackend::new());
        let staff = Uuid::new_v4();
        backend.set_role(staff, Role::Agency);
        let acl = AccessControl::new(backend);

        assert!(acl.check_access(Some(staff), Resource::AuditLog, Operation::Write).await);
    }

    #[tokio::test]
    async fn test_client_needs_permission() {
        let backend = Arc::new(InMemoryBackend::new());
        let client = Uuid::new_v4();
        backend.set_role(client, Role::Client);
        backend.grant(client, "campaigns", "read");
        let acl = AccessControl::new(backend.clone());

        assert!(acl.check_access(Some(client), Resource::Campaigns, Operation::Read).await);
        assert!(!acl.check_access(Some(client), Resource::Campaigns, Operation::Write).await);

        backend.set_faults(Faults { lookups: true, ..Default::default() });
        assert!(!acl.check_access(Some(client), Resource::Campaigns, Operation::Read).await);
    }

    #[tokio::test]
    async fn test_anonymous_denied() {
        let acl = AccessControl::new(Arc::new(InMemoryBackend::new()));
        assert!(!acl.check_access(None, Resource::Settings, Operation::Read).await);
    }
}
