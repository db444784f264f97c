//! SID Validation
//!
//! A SID is valid for the current actor when a `sid_lookup` row links the two
//! and the backing settings row is `active`. Both checks run concurrently and
//! are raced together against a timeout; failed attempts are retried with
//! linear backoff.

use crate::audit::{AuditCategory, AuditDetails, AuditEntry, AuditLogger, AuthContext, AuthHints};
use crate::backend::{AccessDirectory, IdentityProvider};
use crate::model::{SettingStatus, Sid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Window for one attempt (both checks together)
    pub timeout_ms: u64,
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Backoff after attempt `n` is `n * backoff_step_ms`
    pub backoff_step_ms: u64,
    /// Retry failures that a retry cannot fix (unlinked, missing, inactive)
    pub retry_definitive_failures: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 3,
            backoff_step_ms: 1_000,
            retry_definitive_failures: true,
        }
    }
}

impl ValidatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms) * attempt
    }
}

/// Why a validation attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("no signed-in user")]
    Unauthenticated,

    #[error("SID is not linked to the current user")]
    NotLinked,

    #[error("no settings row for SID")]
    RecordMissing,

    #[error("account status is {status}, expected active")]
    Inactive { status: SettingStatus },

    #[error("validation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("backend error: {message}")]
    Backend { message: String },
}

impl ValidationFailure {
    /// Failures a retry cannot change
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::NotLinked | Self::RecordMissing | Self::Inactive { .. }
        )
    }

    /// What the failure says about the link check, when anything
    pub fn lookup_hint(&self) -> Option<bool> {
        match self {
            Self::NotLinked => Some(false),
            Self::RecordMissing | Self::Inactive { .. } => Some(true),
            Self::Unauthenticated | Self::Timeout { .. } | Self::Backend { .. } => None,
        }
    }
}

/// Result of a validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub sid: Sid,
    /// Attempts consumed, `1..=max_attempts`
    pub attempts: u32,
    pub result: Result<(), ValidationFailure>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        self.result.as_ref().err()
    }
}

/// SID validator
#[derive(Clone)]
pub struct Validator {
    directory: Arc<dyn AccessDirectory>,
    identity: Arc<dyn IdentityProvider>,
    audit: AuditLogger,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(
        directory: Arc<dyn AccessDirectory>,
        identity: Arc<dyn IdentityProvider>,
        audit: AuditLogger,
        config: ValidatorConfig,
    ) -> Self {
        Self { directory, identity, audit, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate `sid` for the current actor, retrying per config
    pub async fn validate(&self, sid: &Sid) -> ValidationOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(sid).await {
                Ok(()) => {
                    self.audit
                        .log(
                            AuditEntry::info("sid_validation_succeeded", AuditCategory::Settings)
                                .details(AuditDetails::Validation {
                                    sid: sid.clone(),
                                    attempt,
                                    reason: None,
                                })
                                .context(AuthContext::Hints(AuthHints {
                                    authenticated: Some(true),
                                    lookup_ok: Some(true),
                                    context_valid: Some(true),
                                })),
                        )
                        .await;

                    return ValidationOutcome {
                        sid: sid.clone(),
                        attempts: attempt,
                        result: Ok(()),
                    };
                }
                Err(failure) => {
                    tracing::warn!(sid = %sid, attempt, reason = %failure, "SID validation attempt failed");
                    self.audit
                        .log(
                            AuditEntry::error("sid_validation_failed", AuditCategory::Settings)
                                .details(AuditDetails::Validation {
                                    sid: sid.clone(),
                                    attempt,
                                    reason: Some(failure.to_string()),
                                })
                                .context(AuthContext::Hints(AuthHints {
                                    authenticated: None,
                                    lookup_ok: failure.lookup_hint(),
                                    context_valid: Some(false),
                                })),
                        )
                        .await;

                    let retry = attempt < max_attempts
                        && (self.config.retry_definitive_failures || !failure.is_definitive());
                    if !retry {
                        return ValidationOutcome {
                            sid: sid.clone(),
                            attempts: attempt,
                            result: Err(failure),
                        };
                    }

                    tokio::time::sleep(self.config.backoff_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, sid: &Sid) -> Result<(), ValidationFailure> {
        let window = self.config.timeout();
        match tokio::time::timeout(window, self.run_checks(sid)).await {
            Ok(result) => result,
            Err(_) => Err(ValidationFailure::Timeout {
                after_ms: window.as_millis() as u64,
            }),
        }
    }

    async fn run_checks(&self, sid: &Sid) -> Result<(), ValidationFailure> {
        let actor = self
            .identity
            .current_actor()
            .await
            .map_err(|e| ValidationFailure::Backend { message: e.to_string() })?
            .ok_or(ValidationFailure::Unauthenticated)?;

        let (linked, status) = tokio::join!(
            self.directory.is_linked(sid, actor),
            self.directory.setting_status(sid),
        );

        let linked = linked.map_err(|e| ValidationFailure::Backend { message: e.to_string() })?;
        let status = status.map_err(|e| ValidationFailure::Backend { message: e.to_string() })?;

        if !linked {
            return Err(ValidationFailure::NotLinked);
        }
        match status {
            None => Err(ValidationFailure::RecordMissing),
            Some(status) if !status.is_active() => Err(ValidationFailure::Inactive { status }),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Severity;
    use crate::backend::StaticIdentity;
    use crate::memory::{Faults, InMemoryBackend};
    use crate::model::Setting;
    use tokio::time::Instant;
    use uuid::Uuid;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        actor: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(InMemoryBackend::new());
            let actor = Uuid::new_v4();
            backend.insert_setting(Setting::new("SID-42".into(), "Acme", "Gold", SettingStatus::Active));
            backend.insert_setting(Setting::new("SID-77".into(), "Dormant", "Silver", SettingStatus::Inactive));
            backend.insert_setting(Setting::new("SID-99".into(), "Other", "Gold", SettingStatus::Active));
            backend.link(&"SID-42".into(), actor);
            backend.link(&"SID-77".into(), actor);
            Self { backend, actor }
        }

        fn validator(&self, config: ValidatorConfig) -> Validator {
            let identity: Arc<dyn IdentityProvider> = Arc::new(StaticIdentity::signed_in(self.actor));
            let audit = AuditLogger::new(identity.clone(), self.backend.clone(), self.backend.clone());
            Validator::new(self.backend.clone(), identity, audit, config)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_linked_sid_passes_first_attempt() {
        let fx = Fixture::new();
        let outcome = fx.validator(ValidatorConfig::default()).validate(&"SID-42".into()).await;

        assert!(outcome.is_valid());
        assert_eq!(outcome.attempts, 1);

        let records = fx.backend.audit_records();
        let infos: Vec<_> = records.iter().filter(|r| r.severity == Severity::Info).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].action, "sid_validation_succeeded");
        assert_eq!(infos[0].flags.lookup_ok, Some(true));
        assert_eq!(infos[0].flags.context_valid, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlinked_sid_fails_after_three_attempts_with_linear_backoff() {
        let fx = Fixture::new();
        let start = Instant::now();

        let outcome = fx.validator(ValidatorConfig::default()).validate(&"SID-99".into()).await;

        assert!(!outcome.is_valid());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.failure(), Some(&ValidationFailure::NotLinked));

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);

        let records = fx.backend.audit_records();
        assert_eq!(records.len(), 3);
        let attempts: Vec<_> = records
            .iter()
            .map(|r| match &r.details {
                Some(AuditDetails::Validation { attempt, .. }) => *attempt,
                _ => 0,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2, 3]);
        assert!(records.iter().all(|r| r.severity == Severity::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_follows_same_retry_path_with_distinct_kind() {
        let fx = Fixture::new();
        let start = Instant::now();

        let outcome = fx.validator(ValidatorConfig::default()).validate(&"SID-77".into()).await;

        assert!(!outcome.is_valid());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.failure(),
            Some(&ValidationFailure::Inactive { status: SettingStatus::Inactive })
        );
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_failures_can_skip_retry() {
        let fx = Fixture::new();
        let config = ValidatorConfig {
            retry_definitive_failures: false,
            ..Default::default()
        };
        let start = Instant::now();

        let outcome = fx.validator(config).validate(&"SID-99".into()).await;

        assert_eq!(outcome.attempts, 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_each_attempt() {
        let fx = Fixture::new();
        fx.backend.set_lookup_latency(Some(Duration::from_secs(10)));
        let start = Instant::now();

        let outcome = fx.validator(ValidatorConfig::default()).validate(&"SID-42".into()).await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.failure(), Some(&ValidationFailure::Timeout { after_ms: 5_000 }));
        // three 5s windows plus 1s and 2s of backoff
        assert!(start.elapsed() >= Duration::from_secs(18));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_is_transient_and_retried() {
        let fx = Fixture::new();
        fx.backend.set_faults(Faults { lookups: true, ..Default::default() });
        let config = ValidatorConfig {
            retry_definitive_failures: false,
            ..Default::default()
        };

        let outcome = fx.validator(config).validate(&"SID-42".into()).await;

        assert_eq!(outcome.attempts, 3);
        assert!(matches!(outcome.failure(), Some(ValidationFailure::Backend { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_actor_is_unauthenticated() {
        let backend = Arc::new(InMemoryBackend::new());
        let identity: Arc<dyn IdentityProvider> = Arc::new(StaticIdentity::anonymous());
        let audit = AuditLogger::new(identity.clone(), backend.clone(), backend.clone());
        let validator = Validator::new(backend.clone(), identity, audit, ValidatorConfig {
            max_attempts: 1,
            ..Default::default()
        });

        let outcome = validator.validate(&"SID-1".into()).await;
        assert_eq!(outcome.failure(), Some(&ValidationFailure::Unauthenticated));
    }

    #[test]
    fn test_backoff_is_linear() {
        let config = ValidatorConfig::default();
        assert_eq!(config.backoff_after(1), Duration::from_secs(1));
        assert_eq!(config.backoff_after(2), Duration::from_secs(2));
    }
}
