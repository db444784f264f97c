//! Project 2025 persistence

use crate::model::{Milestone, MilestoneId, Note, ProjectRecord, Stage};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use portal_access::{BackendError, BackendResult, Sid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Project 2025 tables
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Stage template, ordered by id
    async fn stages(&self) -> BackendResult<Vec<Stage>>;

    /// Milestone template, ordered by id
    async fn milestones(&self) -> BackendResult<Vec<Milestone>>;

    /// Raw milestone columns for an account
    async fn record(&self, sid: &Sid) -> BackendResult<Option<ProjectRecord>>;

    /// Notes for one milestone, newest first
    async fn notes(&self, sid: &Sid, milestone_id: MilestoneId) -> BackendResult<Vec<Note>>;

    async fn insert_note(&self, sid: &Sid, milestone_id: MilestoneId, note: &str) -> BackendResult<Note>;

    /// Delete every note, returning how many were removed
    async fn purge_notes(&self) -> BackendResult<usize>;
}

/// In-memory project tables
pub struct InMemoryProjectRepository {
    stages: RwLock<Vec<Stage>>,
    milestones: RwLock<Vec<Milestone>>,
    records: RwLock<HashMap<Sid, ProjectRecord>>,
    notes: RwLock<Vec<Note>>,
    next_note_id: AtomicU64,
    fail_templates: AtomicBool,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self {
            stages: RwLock::new(Vec::new()),
            milestones: RwLock::new(Vec::new()),
            records: RwLock::new(HashMap::new()),
            notes: RwLock::new(Vec::new()),
            next_note_id: AtomicU64::new(1),
            fail_templates: AtomicBool::new(false),
        }
    }

    /// Repository seeded with the standard four-stage template
    pub fn standard() -> Self {
        let repo = Self::new();
        let (stages, milestones) = standard_template();
        *repo.stages.write() = stages;
        *repo.milestones.write() = milestones;
        repo
    }

    /// Store a record; records without a SID are ignored
    pub fn put_record(&self, record: ProjectRecord) {
        if let Some(sid) = record.sid.clone() {
            self.records.write().insert(sid, record);
        }
    }

    /// Make template reads fail
    pub fn fail_templates(&self, fail: bool) {
        self.fail_templates.store(fail, Ordering::SeqCst);
    }

    pub fn note_count(&self) -> usize {
        self.notes.read().len()
    }

    fn check_templates(&self) -> BackendResult<()> {
        if self.fail_templates.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("project_2025 template tables".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryProjectRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn stages(&self) -> BackendResult<Vec<Stage>> {
        self.check_templates()?;
        Ok(self.stages.read().clone())
    }

    async fn milestones(&self) -> BackendResult<Vec<Milestone>> {
        self.check_templates()?;
        Ok(self.milestones.read().clone())
    }

    async fn record(&self, sid: &Sid) -> BackendResult<Option<ProjectRecord>> {
        Ok(self.records.read().get(sid).cloned())
    }

    async fn notes(&self, sid: &Sid, milestone_id: MilestoneId) -> BackendResult<Vec<Note>> {
        let mut notes: Vec<_> = self
            .notes
            .read()
            .iter()
            .filter(|n| &n.sid == sid && n.milestone_id == milestone_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.note_id.cmp(&a.note_id)));
        Ok(notes)
    }

    async fn insert_note(&self, sid: &Sid, milestone_id: MilestoneId, note: &str) -> BackendResult<Note> {
        let note = Note {
            note_id: self.next_note_id.fetch_add(1, Ordering::SeqCst),
            sid: sid.clone(),
            milestone_id,
            note: note.to_string(),
            created_at: Utc::now(),
        };
        self.notes.write().push(note.clone());
        Ok(note)
    }

    async fn purge_notes(&self) -> BackendResult<usize> {
        let mut notes = self.notes.write();
        let removed = notes.len();
        notes.clear();
        Ok(removed)
    }
}

/// Four stages, milestones 1-21
pub fn standard_template() -> (Vec<Stage>, Vec<Milestone>) {
    let stages = [
        (1, "Onboarding"),
        (2, "Foundations"),
        (3, "Launch"),
        (4, "Growth"),
    ]
    .into_iter()
    .map(|(stage_id, name)| Stage {
        stage_id,
        stage_name: name.to_string(),
    })
    .collect();

    let milestones = [
        (1, 1, "Contract signed"),
        (2, 1, "Kick-off call held"),
        (3, 1, "Portal access granted"),
        (4, 1, "Billing details confirmed"),
        (5, 1, "Analytics access shared"),
        (6, 2, "Brand assets received"),
        (7, 2, "Marketing plan approved"),
        (8, 2, "Ad account connected"),
        (9, 2, "CRM integration connected"),
        (10, 2, "Audience personas documented"),
        (11, 3, "Launch date agreed"),
        (12, 3, "Landing pages live"),
        (13, 3, "Tracking verified"),
        (14, 3, "First campaign live"),
        (15, 3, "Launch report sent"),
        (16, 4, "30-day review"),
        (17, 4, "Budget reallocation agreed"),
        (18, 4, "Content calendar extended"),
        (19, 4, "Quarterly strategy meeting"),
        (20, 4, "Case study drafted"),
        (21, 4, "Renewal terms recorded"),
    ]
    .into_iter()
    .map(|(milestone_id, stage_id, description)| Milestone {
        milestone_id,
        stage_id,
        description: description.to_string(),
    })
    .collect();

    (stages, milestones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notes_newest_first_and_scoped() {
        let repo = InMemoryProjectRepository::standard();
        let a: Sid = "SID-A".into();
        let b: Sid = "SID-B".into();
        repo.insert_note(&a, 6, "first").await.unwrap();
        repo.insert_note(&a, 6, "second").await.unwrap();
        repo.insert_note(&b, 6, "other account").await.unwrap();
        repo.insert_note(&a, 7, "other milestone").await.unwrap();

        let notes = repo.notes(&a, 6).await.unwrap();
        let texts: Vec<_> = notes.iter().map(|n| n.note.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_purge_removes_everything() {
        let repo = InMemoryProjectRepository::standard();
        repo.insert_note(&"S".into(), 1, "x").await.unwrap();
        repo.insert_note(&"T".into(), 2, "y").await.unwrap();

        assert_eq!(repo.purge_notes().await.unwrap(), 2);
        assert_eq!(repo.note_count(), 0);
        assert_eq!(repo.purge_notes().await.unwrap(), 0);
    }

    #[test]
    fn test_standard_template_shape() {
        let (stages, milestones) = standard_template();
        assert_eq!(stages.len(), 4);
        assert_eq!(milestones.len(), 21);
        assert!(milestones.iter().all(|m| (1..=4).contains(&m.stage_id)));
    }
}
