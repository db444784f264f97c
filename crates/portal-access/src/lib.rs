//! Portal Access Core
//!
//! Tenant context, SID validation and access auditing for the agency portal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PORTAL ACCESS CORE                             │
//! │                                                                         │
//! │  ┌──────────────────┐    set()    ┌──────────────────────────────────┐ │
//! │  │  TENANT CONTEXT  │────────────▶│            VALIDATOR             │ │
//! │  │  current_sid in  │             │  sid_lookup ┐                    │ │
//! │  │ session storage  │             │             ├─ join ─ timeout    │ │
//! │  └────────┬─────────┘             │  status     ┘   retry 1s, 2s     │ │
//! │           │                       └───────────────┬──────────────────┘ │
//! │           │                                       │                    │
//! │  ┌────────▼───────────────────────────────────────▼──────────────────┐ │
//! │  │                         AUDIT LOGGER                              │ │
//! │  │   actor │ re-derived lookup + policy probe │ append-only insert   │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │      HOSTED BACKEND (IdentityProvider, AccessDirectory, AuditSink)│ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod model;
pub mod backend;
pub mod audit;
pub mod validator;
pub mod context;
pub mod rbac;
pub mod memory;

use std::sync::Arc;

pub use audit::{
    AuditCategory, AuditDetails, AuditEntry, AuditError, AuditLogger, AuditQuery, AuditRecord,
    AuthContext, AuthHints, DerivedAuthFlags, PolicyCheck, RuntimeMode, Severity,
};
pub use backend::{AccessDirectory, AuditSink, BackendError, BackendResult, IdentityProvider, StaticIdentity};
pub use context::{MemorySessionStorage, SessionStorage, TenantContextError, TenantContextStore, CURRENT_SID_KEY};
pub use memory::InMemoryBackend;
pub use model::{ActorId, Account, ClientConfig, CrmClient, Role, Setting, SettingStatus, Sid};
pub use rbac::{AccessControl, Operation, Resource};
pub use validator::{ValidationFailure, ValidationOutcome, Validator, ValidatorConfig};

/// Shared collaborators, bound to an identity per session or request
#[derive(Clone)]
pub struct AccessServices {
    directory: Arc<dyn AccessDirectory>,
    sink: Arc<dyn AuditSink>,
    runtime: RuntimeMode,
    validator_config: ValidatorConfig,
}

impl AccessServices {
    pub fn new(directory: Arc<dyn AccessDirectory>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            directory,
            sink,
            runtime: RuntimeMode::default(),
            validator_config: ValidatorConfig::default(),
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeMode) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    pub fn directory(&self) -> &Arc<dyn AccessDirectory> {
        &self.directory
    }

    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    pub fn audit_for(&self, identity: Arc<dyn IdentityProvider>) -> AuditLogger {
        AuditLogger::new(identity, self.directory.clone(), self.sink.clone()).with_runtime(self.runtime)
    }

    pub fn validator_for(&self, identity: Arc<dyn IdentityProvider>) -> Validator {
        let audit = self.audit_for(identity.clone());
        Validator::new(self.directory.clone(), identity, audit, self.validator_config.clone())
    }

    pub fn context_for(
        &self,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn SessionStorage>,
    ) -> TenantContextStore {
        let audit = self.audit_for(identity.clone());
        TenantContextStore::new(storage, self.validator_for(identity), audit)
    }

    pub fn access_control(&self) -> AccessControl {
        AccessControl::new(self.directory.clone())
    }
}
