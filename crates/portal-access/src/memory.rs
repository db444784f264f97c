//! In-memory backend (for testing and development)

use crate::audit::{AuditQuery, AuditRecord};
use crate::backend::{AccessDirectory, AuditSink, BackendError, BackendResult};
use crate::model::{Account, ActorId, ClientConfig, CrmClient, Role, Setting, SettingStatus, Sid};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Injected failures
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// `sid_lookup` and status checks error out
    pub lookups: bool,
    /// Settings/CRM reads are denied by row policy
    pub reads: bool,
    /// Audit inserts fail
    pub audit_writes: bool,
}

/// In-memory implementation of the hosted backend
#[derive(Default)]
pub struct InMemoryBackend {
    settings: RwLock<HashMap<Sid, Setting>>,
    crm: RwLock<HashMap<Sid, CrmClient>>,
    links: RwLock<HashSet<(Sid, ActorId)>>,
    roles: RwLock<HashMap<ActorId, Role>>,
    permissions: RwLock<HashSet<(ActorId, String, String)>>,
    accounts: RwLock<HashMap<String, Account>>,
    configs: RwLock<HashMap<Sid, ClientConfig>>,
    audit: RwLock<Vec<AuditRecord>>,
    faults: RwLock<Faults>,
    lookup_latency: RwLock<Option<Duration>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a settings row and its CRM twin
    pub fn insert_setting(&self, setting: Setting) {
        self.crm
            .write()
            .insert(setting.sid.clone(), CrmClient::for_setting(&setting));
        self.settings.write().insert(setting.sid.clone(), setting);
    }

    pub fn set_status(&self, sid: &Sid, status: SettingStatus) {
        if let Some(setting) = self.settings.write().get_mut(sid) {
            setting.status = status;
        }
    }

    pub fn link(&self, sid: &Sid, actor: ActorId) {
        self.links.write().insert((sid.clone(), actor));
    }

    pub fn unlink(&self, sid: &Sid, actor: ActorId) {
        self.links.write().remove(&(sid.clone(), actor));
    }

    pub fn set_role(&self, actor: ActorId, role: Role) {
        self.roles.write().insert(actor, role);
    }

    pub fn grant(&self, actor: ActorId, resource: &str, action: &str) {
        self.permissions
            .write()
            .insert((actor, resource.to_string(), action.to_string()));
    }

    pub fn add_account(&self, account: Account) {
        self.roles.write().insert(account.actor_id, account.role);
        self.accounts
            .write()
            .insert(account.email.to_lowercase(), account);
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.write() = faults;
    }

    /// Delay applied to link and status checks
    pub fn set_lookup_latency(&self, latency: Option<Duration>) {
        *self.lookup_latency.write() = latency;
    }

    /// Snapshot of the audit store in insertion order
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().clone()
    }

    fn faults(&self) -> Faults {
        *self.faults.read()
    }

    async fn lookup_delay(&self) {
        let latency = *self.lookup_latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_lookups(&self) -> BackendResult<()> {
        if self.faults().lookups {
            return Err(BackendError::Unavailable("sid_lookup query failed".into()));
        }
        Ok(())
    }

    fn check_reads(&self, table: &str) -> BackendResult<()> {
        if self.faults().reads {
            return Err(BackendError::Denied(format!("permission denied for table {}", table)));
        }
        Ok(())
    }
}

#[async_trait]
impl AccessDirectory for InMemoryBackend {
    async fn is_linked(&self, sid: &Sid, actor: ActorId) -> BackendResult<bool> {
        self.lookup_delay().await;
        self.check_lookups()?;
        Ok(self.links.read().contains(&(sid.clone(), actor)))
    }

    async fn setting_status(&self, sid: &Sid) -> BackendResult<Option<SettingStatus>> {
        self.lookup_delay().await;
        self.check_lookups()?;
        Ok(self.settings.read().get(sid).map(|s| s.status.clone()))
    }

    async fn setting(&self, sid: &Sid) -> BackendResult<Option<Setting>> {
        self.check_reads("settings")?;
        Ok(self.settings.read().get(sid).cloned())
    }

    async fn settings(&self) -> BackendResult<Vec<Setting>> {
        self.check_reads("settings")?;
        let mut rows: Vec<_> = self.settings.read().values().cloned().collect();
        rows.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        Ok(rows)
    }

    async fn linked_sids(&self, actor: ActorId) -> BackendResult<Vec<Sid>> {
        self.check_lookups()?;
        let mut sids: Vec<_> = self
            .links
            .read()
            .iter()
            .filter(|(_, a)| *a == actor)
            .map(|(sid, _)| sid.clone())
            .collect();
        sids.sort();
        Ok(sids)
    }

    async fn crm_client(&self, sid: &Sid) -> BackendResult<Option<CrmClient>> {
        self.check_reads("crm_client")?;
        Ok(self.crm.read().get(sid).cloned())
    }

    async fn update_package(&self, sid: &Sid, package: &str) -> BackendResult<()> {
        let mut settings = self.settings.write();
        let setting = settings
            .get_mut(sid)
            .ok_or_else(|| BackendError::NotFound(sid.to_string()))?;
        setting.package = package.to_string();
        if let Some(crm) = self.crm.write().get_mut(sid) {
            crm.package = package.to_string();
        }
        Ok(())
    }

    async fn role_of(&self, actor: ActorId) -> BackendResult<Option<Role>> {
        Ok(self.roles.read().get(&actor).copied())
    }

    async fn check_permission(&self, actor: ActorId, resource: &str, action: &str) -> BackendResult<bool> {
        self.check_lookups()?;
        Ok(self
            .permissions
            .read()
            .contains(&(actor, resource.to_string(), action.to_string())))
    }

    async fn account_by_email(&self, email: &str) -> BackendResult<Option<Account>> {
        Ok(self.accounts.read().get(&email.to_lowercase()).cloned())
    }

    async fn client_config(&self, sid: &Sid) -> BackendResult<Option<ClientConfig>> {
        self.check_reads("client_settings")?;
        Ok(self.configs.read().get(sid).cloned())
    }

    async fn save_client_config(&self, sid: &Sid, config: &ClientConfig) -> BackendResult<()> {
        self.configs.write().insert(sid.clone(), config.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditSink for InMemoryBackend {
    async fn append(&self, record: AuditRecord) -> BackendResult<()> {
        if self.faults().audit_writes {
            return Err(BackendError::Storage("access_log insert rejected".into()));
        }
        self.audit.write().push(record);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> BackendResult<Vec<AuditRecord>> {
        let records = self.audit.read();
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_package_update_touches_both_tables() {
        let backend = InMemoryBackend::new();
        let sid = Sid::from("SID-7");
        backend.insert_setting(Setting::new(sid.clone(), "Beta", "Bronze", SettingStatus::Active));

        backend.update_package(&sid, "Platinum").await.unwrap();

        assert_eq!(backend.setting(&sid).await.unwrap().unwrap().package, "Platinum");
        assert_eq!(backend.crm_client(&sid).await.unwrap().unwrap().package, "Platinum");
        assert!(backend.update_package(&Sid::from("nope"), "x").await.is_err());
    }

    #[tokio::test]
    async fn test_settings_sorted_by_account_name() {
        let backend = InMemoryBackend::new();
        backend.insert_setting(Setting::new("B".into(), "Zed Co", "Gold", SettingStatus::Active));
        backend.insert_setting(Setting::new("A".into(), "Acme", "Gold", SettingStatus::Inactive));

        let names: Vec<_> = backend.settings().await.unwrap().into_iter().map(|s| s.account_name).collect();
        assert_eq!(names, vec!["Acme", "Zed Co"]);
    }

    #[tokio::test]
    async fn test_linked_sids_per_actor() {
        let backend = InMemoryBackend::new();
        let actor = Uuid::new_v4();
        backend.link(&"S2".into(), actor);
        backend.link(&"S1".into(), actor);
        backend.link(&"S3".into(), Uuid::new_v4());

        let sids = backend.linked_sids(actor).await.unwrap();
        assert_eq!(sids, vec![Sid::from("S1"), Sid::from("S2")]);
    }

    #[tokio::test]
    async fn test_faults_surface_as_errors() {
        let backend = InMemoryBackend::new();
        backend.set_faults(Faults { lookups: true, reads: true, audit_writes: false });

        assert!(backend.is_linked(&"S".into(), Uuid::new_v4()).await.is_err());
        assert!(matches!(backend.setting(&"S".into()).await, Err(BackendError::Denied(_))));
    }
}
