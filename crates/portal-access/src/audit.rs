//! Access Audit Logging
//!
//! Every significant portal action is appended to the audit store together
//! with authorization signals that the logger re-derives on its own instead
//! of trusting the caller. Logging is terminal: a failure here is reported
//! on the developer console and never reaches the caller.

use crate::backend::{AccessDirectory, AuditSink, BackendError, IdentityProvider};
use crate::model::{ActorId, Sid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Tracing target for the developer console mirror
pub const CONSOLE_TARGET: &str = "portal_access::console";

/// Name of the row policy probed during re-derivation
pub const SETTINGS_POLICY: &str = "settings_access";

/// Runtime mode, controls the developer console mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    Development,
    #[default]
    Production,
}

/// Audit severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Target category (the table an action concerns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Settings,
    ClientSettings,
    Project2025,
    Campaigns,
    Session,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::ClientSettings => "client_settings",
            Self::Project2025 => "project_2025",
            Self::Campaigns => "campaigns",
            Self::Session => "session",
        }
    }
}

/// Structured details, one variant per kind of event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetails {
    ContextSwitch {
        previous_sid: Option<Sid>,
        new_sid: Sid,
    },
    ContextSwitchFailed {
        previous_sid: Option<Sid>,
        new_sid: Sid,
        attempts: u32,
        reason: String,
    },
    ContextLeft {
        from_sid: Option<Sid>,
    },
    Validation {
        sid: Sid,
        attempt: u32,
        reason: Option<String>,
    },
    SidAccess {
        sid: Sid,
    },
    PackageUpdate {
        sid: Sid,
        old_package: String,
        new_package: String,
    },
    MilestoneNote {
        sid: Sid,
        milestone_id: u32,
    },
    NotesPurged {
        removed: usize,
    },
    Campaign {
        sid: Sid,
        campaign_id: Uuid,
    },
    CampaignItemStatus {
        sid: Sid,
        item_id: Uuid,
        status: String,
    },
    SignIn {
        email: String,
    },
    SignOut {
        email: String,
    },
    Failure {
        sid: Option<Sid>,
        error: String,
    },
}

/// Caller-supplied hints, used only when the logger has nothing to re-derive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHints {
    pub authenticated: Option<bool>,
    pub lookup_ok: Option<bool>,
    pub context_valid: Option<bool>,
}

/// Authorization context attached to an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// Nothing to report beyond the actor
    #[default]
    None,
    /// Caller hints, taken as-is
    Hints(AuthHints),
    /// Tenant-scoped action; flags are re-derived against this SID
    Tenant(Sid),
}

/// Outcome of probing the settings row policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub name: String,
    pub allowed: bool,
    pub reason: Option<String>,
}

/// Authorization signals stored with each record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAuthFlags {
    pub authenticated: bool,
    pub lookup_ok: Option<bool>,
    pub context_valid: Option<bool>,
    pub policy_check: Option<PolicyCheck>,
}

/// Persisted audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub action: String,
    pub category: AuditCategory,
    pub severity: Severity,
    pub actor_id: Option<ActorId>,
    pub details: Option<AuditDetails>,
    pub timestamp: DateTime<Utc>,
    pub flags: DerivedAuthFlags,
}

/// Entry handed to the logger
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: String,
    pub category: AuditCategory,
    pub severity: Severity,
    pub details: Option<AuditDetails>,
    pub context: AuthContext,
}

impl AuditEntry {
    pub fn new(action: &str, category: AuditCategory, severity: Severity) -> Self {
        Self {
            action: action.to_string(),
            category,
            severity,
            details: None,
            context: AuthContext::None,
        }
    }

    pub fn info(action: &str, category: AuditCategory) -> Self {
        Self::new(action, category, Severity::Info)
    }

    pub fn warn(action: &str, category: AuditCategory) -> Self {
        Self::new(action, category, Severity::Warn)
    }

    pub fn error(action: &str, category: AuditCategory) -> Self {
        Self::new(action, category, Severity::Error)
    }

    pub fn details(mut self, details: AuditDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn context(mut self, context: AuthContext) -> Self {
        self.context = context;
        self
    }
}

/// Audit query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub actor_id: Option<ActorId>,
    pub severity: Option<Severity>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(action) = &self.action {
            if &record.action != action {
                return false;
            }
        }
        if let Some(actor) = &self.actor_id {
            if record.actor_id.as_ref() != Some(actor) {
                return false;
            }
        }
        if let Some(severity) = &self.severity {
            if record.severity != *severity {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    LogWriteFailure(#[from] BackendError),
}

/// Audit logger
#[derive(Clone)]
pub struct AuditLogger {
    identity: Arc<dyn IdentityProvider>,
    directory: Arc<dyn AccessDirectory>,
    sink: Arc<dyn AuditSink>,
    runtime: RuntimeMode,
}

impl AuditLogger {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        directory: Arc<dyn AccessDirectory>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            identity,
            directory,
            sink,
            runtime: RuntimeMode::default(),
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeMode) -> Self {
        self.runtime = runtime;
        self
    }

    /// Log an entry. Never fails; write errors go to the developer console.
    pub async fn log(&self, entry: AuditEntry) {
        match self.try_log(entry).await {
            Ok(record) => {
                if self.runtime == RuntimeMode::Development {
                    mirror_to_console(&record);
                }
            }
            Err(e) => {
                tracing::error!(target: CONSOLE_TARGET, error = %e, "Logging error");
            }
        }
    }

    /// Build and persist a record, reporting write failures
    pub async fn try_log(&self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        let actor = self.resolve_actor().await;
        let flags = self.derive_flags(actor, &entry.context).await;

        let record = AuditRecord {
            id: Uuid::new_v4(),
            action: entry.action,
            category: entry.category,
            severity: entry.severity,
            actor_id: actor,
            details: entry.details,
            timestamp: Utc::now(),
            flags,
        };

        self.sink.append(record.clone()).await?;
        Ok(record)
    }

    async fn resolve_actor(&self) -> Option<ActorId> {
        match self.identity.current_actor().await {
            Ok(actor) => actor,
            Err(e) => {
                tracing::warn!(target: CONSOLE_TARGET, error = %e, "actor lookup failed, logging anonymously");
                None
            }
        }
    }

    async fn derive_flags(&self, actor: Option<ActorId>, context: &AuthContext) -> DerivedAuthFlags {
        match context {
            AuthContext::None => DerivedAuthFlags {
                authenticated: actor.is_some(),
                ..Default::default()
            },
            AuthContext::Hints(hints) => DerivedAuthFlags {
                authenticated: hints.authenticated.unwrap_or(actor.is_some()),
                lookup_ok: hints.lookup_ok,
                context_valid: Some(hints.context_valid.unwrap_or(false)),
                policy_check: None,
            },
            AuthContext::Tenant(sid) => {
                let lookup_ok = self.verify_link(actor, sid).await;
                let policy_check = if lookup_ok {
                    Some(self.check_policy(sid).await)
                } else {
                    None
                };
                let context_valid = lookup_ok
                    && policy_check.as_ref().map(|p| p.allowed).unwrap_or(false);

                DerivedAuthFlags {
                    authenticated: actor.is_some(),
                    lookup_ok: Some(lookup_ok),
                    context_valid: Some(context_valid),
                    policy_check,
                }
            }
        }
    }

    async fn verify_link(&self, actor: Option<ActorId>, sid: &Sid) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match self.directory.is_linked(sid, actor).await {
            Ok(linked) => linked,
            Err(e) => {
                tracing::warn!(target: CONSOLE_TARGET, sid = %sid, error = %e, "SID lookup failed during audit");
                false
            }
        }
    }

    async fn check_policy(&self, sid: &Sid) -> PolicyCheck {
        let (allowed, reason) = match self.directory.setting(sid).await {
            Ok(Some(_)) => (true, None),
            Ok(None) => (false, Some(format!("no settings row visible for {}", sid))),
            Err(e) => (false, Some(e.to_string())),
        };
        PolicyCheck {
            name: SETTINGS_POLICY.to_string(),
            allowed,
            reason,
        }
    }
}

fn mirror_to_console(record: &AuditRecord) {
    let span = tracing::info_span!(
        target: CONSOLE_TARGET,
        "audit",
        severity = %record.severity,
        action = %record.action,
    );
    let _group = span.enter();

    let user = record
        .actor_id
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Not authenticated".into());
    tracing::info!(target: CONSOLE_TARGET, table = record.category.as_str(), user = %user);
    if let Some(details) = &record.details {
        tracing::info!(target: CONSOLE_TARGET, details = ?details);
    }
    tracing::info!(
        target: CONSOLE_TARGET,
        authenticated = record.flags.authenticated,
        sid_lookup = ?record.flags.lookup_ok,
        rls_policy = ?record.flags.policy_check.as_ref().map(|p| p.allowed),
        context_valid = ?record.flags.context_valid,
        "Access Control Status"
    );
}
