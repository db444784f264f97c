//! Tenant Context Store
//!
//! Holds the SID selected for the current browsing session. The value lives
//! in session-scoped storage under [`CURRENT_SID_KEY`] and is only ever
//! written after the SID passes validation.

use crate::audit::{AuditCategory, AuditDetails, AuditEntry, AuditLogger, AuthContext, AuthHints};
use crate::model::Sid;
use crate::validator::{ValidationFailure, Validator};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Well-known session key for the current SID
pub const CURRENT_SID_KEY: &str = "current_sid";

/// Session-scoped key/value storage
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Session storage held in memory for the lifetime of one session
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TenantContextError {
    #[error("invalid tenant {sid} after {attempts} attempt(s): {failure}")]
    InvalidTenant {
        sid: Sid,
        attempts: u32,
        failure: ValidationFailure,
    },
}

/// Tenant context for one session
pub struct TenantContextStore {
    storage: Arc<dyn SessionStorage>,
    validator: Validator,
    audit: AuditLogger,
}

impl TenantContextStore {
    pub fn new(storage: Arc<dyn SessionStorage>, validator: Validator, audit: AuditLogger) -> Self {
        Self { storage, validator, audit }
    }

    /// Current SID, if one is set
    pub fn get(&self) -> Option<Sid> {
        self.storage.get(CURRENT_SID_KEY).and_then(Sid::parse)
    }

    /// Validate and switch to `sid`, returning the previous SID.
    /// The stored value is untouched when validation fails.
    pub async fn set(&self, sid: Sid) -> Result<Option<Sid>, TenantContextError> {
        let previous = self.get();
        let outcome = self.validator.validate(&sid).await;

        if let Err(failure) = outcome.result {
            self.audit
                .log(
                    AuditEntry::error("sid_context_switch_error", AuditCategory::Settings)
                        .details(AuditDetails::ContextSwitchFailed {
                            previous_sid: previous,
                            new_sid: sid.clone(),
                            attempts: outcome.attempts,
                            reason: failure.to_string(),
                        })
                        .context(AuthContext::Hints(AuthHints {
                            authenticated: None,
                            lookup_ok: failure.lookup_hint(),
                            context_valid: Some(false),
                        })),
                )
                .await;

            return Err(TenantContextError::InvalidTenant {
                sid,
                attempts: outcome.attempts,
                failure,
            });
        }

        self.storage.set(CURRENT_SID_KEY, sid.as_str().to_string());
        tracing::info!(previous = ?previous.as_ref().map(Sid::as_str), sid = %sid, "tenant context switched");

        self.audit
            .log(
                AuditEntry::info("sid_context_switch", AuditCategory::Settings)
                    .details(AuditDetails::ContextSwitch {
                        previous_sid: previous.clone(),
                        new_sid: sid.clone(),
                    })
                    .context(AuthContext::Tenant(sid)),
            )
            .await;

        Ok(previous)
    }

    /// Drop the current SID. Idempotent.
    pub fn clear(&self) {
        self.storage.remove(CURRENT_SID_KEY);
    }

    /// Navigate away from the tenant-scoped views
    pub async fn leave(&self) {
        let from_sid = self.get();
        self.audit
            .log(
                AuditEntry::info("navigate_back", AuditCategory::Settings)
                    .details(AuditDetails::ContextLeft { from_sid }),
            )
            .await;
        self.clear();
    }

    /// Guard that clears the context when the owning view goes away
    pub fn scope(&self) -> ContextScope<'_> {
        ContextScope { store: self }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

/// Clears the tenant context on drop
pub struct ContextScope<'a> {
    store: &'a TenantContextStore,
}

impl Deref for ContextScope<'_> {
    type Target = TenantContextStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Severity;
    use crate::backend::{IdentityProvider, StaticIdentity};
    use crate::memory::InMemoryBackend;
    use crate::model::{Setting, SettingStatus};
    use crate::validator::ValidatorConfig;
    use tokio::time::{Duration, Instant};
    use uuid::Uuid;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        storage: Arc<MemorySessionStorage>,
        store: TenantContextStore,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let u1 = Uuid::new_v4();
        backend.insert_setting(Setting::new("SID-42".into(), "Acme", "Gold", SettingStatus::Active));
        backend.insert_setting(Setting::new("SID-43".into(), "Acme EU", "Gold", SettingStatus::Active));
        backend.insert_setting(Setting::new("SID-99".into(), "Other", "Gold", SettingStatus::Active));
        backend.link(&"SID-42".into(), u1);
        backend.link(&"SID-43".into(), u1);

        let identity: Arc<dyn IdentityProvider> = Arc::new(StaticIdentity::signed_in(u1));
        let audit = AuditLogger::new(identity.clone(), backend.clone(), backend.clone());
        let validator = Validator::new(backend.clone(), identity, audit.clone(), ValidatorConfig::default());
        let storage = Arc::new(MemorySessionStorage::new());
        let store = TenantContextStore::new(storage.clone(), validator, audit);

        Fixture { backend, storage, store }
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_valid_sid() {
        let fx = fixture();

        let previous = fx.store.set("SID-42".into()).await.unwrap();

        assert!(previous.is_none());
        assert_eq!(fx.store.get(), Some(Sid::from("SID-42")));
        let switch = fx
            .backend
            .audit_records()
            .into_iter()
            .find(|r| r.action == "sid_context_switch")
            .unwrap();
        assert_eq!(switch.severity, Severity::Info);
        assert_eq!(switch.flags.context_valid, Some(true));
        assert_eq!(
            switch.details,
            Some(AuditDetails::ContextSwitch { previous_sid: None, new_sid: "SID-42".into() })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_unlinked_sid_rejects_and_keeps_prior_value() {
        let fx = fixture();
        fx.store.set("SID-42".into()).await.unwrap();
        let start = Instant::now();

        let err = fx.store.set("SID-99".into()).await.unwrap_err();

        assert!(start.elapsed() >= Duration::from_secs(3));
        let TenantContextError::InvalidTenant { sid, attempts, failure } = err;
        assert_eq!(sid, Sid::from("SID-99"));
        assert_eq!(attempts, 3);
        assert_eq!(failure, ValidationFailure::NotLinked);
        assert_eq!(fx.store.get(), Some(Sid::from("SID-42")));

        let errors: Vec<_> = fx
            .backend
            .audit_records()
            .into_iter()
            .filter(|r| r.action == "sid_context_switch_error")
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_set_from_empty_stays_empty() {
        let fx = fixture();
        assert!(fx.store.set("SID-99".into()).await.is_err());
        assert!(fx.store.get().is_none());
        assert!(fx.storage.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_reports_previous() {
        let fx = fixture();
        fx.store.set("SID-42".into()).await.unwrap();
        let previous = fx.store.set("SID-43".into()).await.unwrap();
        assert_eq!(previous, Some(Sid::from("SID-42")));
        assert_eq!(fx.store.get(), Some(Sid::from("SID-43")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_idempotent() {
        let fx = fixture();
        fx.store.clear();
        assert!(fx.store.get().is_none());

        fx.store.set("SID-42".into()).await.unwrap();
        fx.store.clear();
        fx.store.clear();
        assert!(fx.store.get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_logs_and_clears() {
        let fx = fixture();
        fx.store.set("SID-42".into()).await.unwrap();

        fx.store.leave().await;

        assert!(fx.store.get().is_none());
        let back = fx
            .backend
            .audit_records()
            .into_iter()
            .find(|r| r.action == "navigate_back")
            .unwrap();
        assert_eq!(back.details, Some(AuditDetails::ContextLeft { from_sid: Some("SID-42".into()) }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scope_clears_on_drop() {
        let fx = fixture();
        {
            let scoped = fx.store.scope();
            scoped.set("SID-42".into()).await.unwrap();
            assert_eq!(scoped.get(), Some(Sid::from("SID-42")));
        }
        assert!(fx.store.get().is_none());
    }

    #[test]
    fn test_value_survives_new_store_on_same_session() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage.set(CURRENT_SID_KEY, "SID-42".into());
        assert_eq!(storage.get(CURRENT_SID_KEY).as_deref(), Some("SID-42"));
        storage.remove(CURRENT_SID_KEY);
        assert!(storage.is_empty());
    }
}
