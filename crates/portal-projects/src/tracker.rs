//! Project 2025 tracker service

use crate::model::{MilestoneCard, MilestoneId, MilestoneStatus, Note, ProjectBoard, StageBoard};
use crate::repository::ProjectRepository;
use crate::status::{captured_notes, derive_statuses};
use portal_access::{AuditCategory, AuditDetails, AuditEntry, AuditLogger, AuthContext, BackendError, Sid};
use std::sync::Arc;
use thiserror::Error;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("note text is empty")]
    EmptyNote,

    #[error("unknown milestone: {0}")]
    UnknownMilestone(MilestoneId),

    #[error("project data unavailable: {0}")]
    Backend(#[from] BackendError),
}

/// Stage/milestone board plus milestone notes for one account
pub struct ProjectTracker {
    repo: Arc<dyn ProjectRepository>,
    audit: AuditLogger,
}

impl ProjectTracker {
    pub fn new(repo: Arc<dyn ProjectRepository>, audit: AuditLogger) -> Self {
        Self { repo, audit }
    }

    /// Board with derived statuses. Free-text milestone values are captured
    /// as notes unless an identical note already exists.
    pub async fn board(&self, sid: &Sid) -> ProjectResult<ProjectBoard> {
        let loaded = tokio::try_join!(self.repo.stages(), self.repo.milestones(), self.repo.record(sid));

        let (stages, milestones, record) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(sid = %sid, error = %e, "failed to load project 2025 data");
                self.audit
                    .log(
                        AuditEntry::error("fetch_project_2025_error", AuditCategory::Project2025)
                            .details(AuditDetails::Failure {
                                sid: Some(sid.clone()),
                                error: e.to_string(),
                            })
                            .context(AuthContext::Tenant(sid.clone())),
                    )
                    .await;
                return Err(e.into());
            }
        };

        if let Some(record) = &record {
            self.capture_notes(sid, captured_notes(record)).await;
        }

        let statuses = derive_statuses(record.as_ref(), milestones.iter().map(|m| m.milestone_id));

        let stages = stages
            .into_iter()
            .map(|stage| {
                let cards: Vec<MilestoneCard> = milestones
                    .iter()
                    .filter(|m| m.stage_id == stage.stage_id)
                    .map(|m| MilestoneCard {
                        milestone: m.clone(),
                        status: statuses
                            .get(&m.milestone_id)
                            .copied()
                            .unwrap_or(MilestoneStatus::Incomplete),
                    })
                    .collect();
                let completed = cards
                    .iter()
                    .filter(|c| c.status == MilestoneStatus::Complete)
                    .count();

                StageBoard {
                    stage,
                    completed,
                    total: cards.len(),
                    milestones: cards,
                }
            })
            .collect();

        Ok(ProjectBoard {
            sid: sid.clone(),
            stages,
        })
    }

    async fn capture_notes(&self, sid: &Sid, values: Vec<(MilestoneId, String)>) {
        for (milestone_id, text) in values {
            let existing = match self.repo.notes(sid, milestone_id).await {
                Ok(notes) => notes,
                Err(e) => {
                    tracing::warn!(sid = %sid, milestone_id, error = %e, "skipping note capture");
                    continue;
                }
            };
            if existing.iter().any(|n| n.note == text) {
                continue;
            }
            if let Err(e) = self.repo.insert_note(sid, milestone_id, &text).await {
                tracing::warn!(sid = %sid, milestone_id, error = %e, "failed to capture milestone note");
            }
        }
    }

    /// Notes for a milestone, newest first
    pub async fn notes(&self, sid: &Sid, milestone_id: MilestoneId) -> ProjectResult<Vec<Note>> {
        Ok(self.repo.notes(sid, milestone_id).await?)
    }

    pub async fn add_note(&self, sid: &Sid, milestone_id: MilestoneId, text: &str) -> ProjectResult<Note> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProjectError::EmptyNote);
        }

        let milestones = self.repo.milestones().await?;
        if !milestones.iter().any(|m| m.milestone_id == milestone_id) {
            return Err(ProjectError::UnknownMilestone(milestone_id));
        }

        let note = self.repo.insert_note(sid, milestone_id, text).await?;
        tracing::info!(sid = %sid, milestone_id, "milestone note added");

        self.audit
            .log(
                AuditEntry::info("add_milestone_note", AuditCategory::Project2025)
                    .details(AuditDetails::MilestoneNote {
                        sid: sid.clone(),
                        milestone_id,
                    })
                    .context(AuthContext::Tenant(sid.clone())),
            )
            .await;

        Ok(note)
    }

    /// Remove every milestone note across all accounts
    pub async fn reset_notes(&self) -> ProjectResult<usize> {
        let removed = self.repo.purge_notes().await?;
        tracing::info!(removed, "project 2025 notes purged");

        self.audit
            .log(
                AuditEntry::warn("reset_project_2025_notes", AuditCategory::Project2025)
                    .details(AuditDetails::NotesPurged { removed }),
            )
            .await;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectRecord;
    use crate::repository::InMemoryProjectRepository;
    use portal_access::{InMemoryBackend, Setting, SettingStatus, Severity, StaticIdentity};
    use uuid::Uuid;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        repo: Arc<InMemoryProjectRepository>,
        tracker: ProjectTracker,
        sid: Sid,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = Arc::new(InMemoryProjectRepository::standard());
        let actor = Uuid::new_v4();
        let sid: Sid = "SID-100".into();
        backend.insert_setting(Setting::new(sid.clone(), "Acme Dental", "Growth", SettingStatus::Active));
        backend.link(&sid, actor);

        let audit = AuditLogger::new(
            Arc::new(StaticIdentity::signed_in(actor)),
            backend.clone(),
            backend.clone(),
        );
        let tracker = ProjectTracker::new(repo.clone(), audit);
        Fixture {
            backend,
            repo,
            tracker,
            sid,
        }
    }

    #[tokio::test]
    async fn test_board_counts_per_stage() {
        let f = fixture();
        f.repo.put_record(
            ProjectRecord::new(f.sid.clone())
                .with(1, "Y")
                .with(2, "Y")
                .with(7, "Y")
                .with(19, "Trying to Arrange"),
        );

        let board = f.tracker.board(&f.sid).await.unwrap();
        assert_eq!(board.stages.len(), 4);
        assert_eq!(board.stages[0].completed, 2);
        assert_eq!(board.stages[0].total, 5);
        assert_eq!(board.stages[1].completed, 1);

        let meeting = board.stages[3]
            .milestones
            .iter()
            .find(|c| c.milestone.milestone_id == 19)
            .unwrap();
        assert_eq!(meeting.status, MilestoneStatus::InProgress);
    }

    #[tokio::test]
    async fn test_board_without_record_is_all_incomplete() {
        let f = fixture();
        let board = f.tracker.board(&f.sid).await.unwrap();
        assert!(board.stages.iter().all(|s| s.completed == 0));
        assert_eq!(board.stages.iter().map(|s| s.total).sum::<usize>(), 21);
    }

    #[tokio::test]
    async fn test_captured_notes_are_not_duplicated() {
        let f = fixture();
        f.repo.put_record(ProjectRecord::new(f.sid.clone()).with(6, "Logo pack received"));

        f.tracker.board(&f.sid).await.unwrap();
        f.tracker.board(&f.sid).await.unwrap();

        let notes = f.tracker.notes(&f.sid, 6).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note, "Logo pack received");
    }

    #[tokio::test]
    async fn test_template_failure_is_audited() {
        let f = fixture();
        f.repo.fail_templates(true);

        let err = f.tracker.board(&f.sid).await.unwrap_err();
        assert!(matches!(err, ProjectError::Backend(_)));

        let records = f.backend.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "fetch_project_2025_error");
        assert_eq!(records[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_add_note_validation() {
        let f = fixture();
        assert!(matches!(
            f.tracker.add_note(&f.sid, 6, "   ").await,
            Err(ProjectError::EmptyNote)
        ));
        assert!(matches!(
            f.tracker.add_note(&f.sid, 99, "hello").await,
            Err(ProjectError::UnknownMilestone(99))
        ));

        let note = f.tracker.add_note(&f.sid, 6, "  Assets in drive  ").await.unwrap();
        assert_eq!(note.note, "Assets in drive");

        let records = f.backend.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "add_milestone_note");
        assert_eq!(records[0].flags.context_valid, Some(true));
    }

    #[tokio::test]
    async fn test_reset_notes_reports_count() {
        let f = fixture();
        f.tracker.add_note(&f.sid, 6, "one").await.unwrap();
        f.tracker.add_note(&f.sid, 10, "two").await.unwrap();

        assert_eq!(f.tracker.reset_notes().await.unwrap(), 2);
        assert!(f.tracker.notes(&f.sid, 6).await.unwrap().is_empty());

        let last = f.backend.audit_records().pop().unwrap();
        assert_eq!(last.action, "reset_project_2025_notes");
        assert_eq!(last.details, Some(AuditDetails::NotesPurged { removed: 2 }));
    }
}
