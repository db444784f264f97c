//! Campaign Data Model

use crate::error::CampaignError;
use chrono::{DateTime, Utc};
use portal_access::Sid;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Catalogue
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignType {
    pub type_id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTemplate {
    pub template_id: Uuid,
    pub type_id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub task_template_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub description: String,
    pub display_order: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskTemplate {
    pub subtask_template_id: Uuid,
    pub task_template_id: Uuid,
    pub name: String,
    pub description: String,
    pub display_order: u32,
}

// =============================================================================
// Client campaigns
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Draft, Self::Cancelled)
                | (Self::Active, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a task or subtask
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCampaign {
    pub campaign_id: Uuid,
    pub sid: Sid,
    pub template_id: Uuid,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

impl ClientCampaign {
    pub fn draft(sid: Sid, template_id: Uuid) -> Self {
        Self {
            campaign_id: Uuid::new_v4(),
            sid,
            template_id,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: CampaignStatus) -> Result<(), CampaignError> {
        if !self.status.can_transition_to(next) {
            return Err(CampaignError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTask {
    pub task_id: Uuid,
    pub campaign_id: Uuid,
    pub task_template_id: Uuid,
    pub status: WorkStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSubtask {
    pub subtask_id: Uuid,
    pub task_id: Uuid,
    pub subtask_template_id: Uuid,
    pub status: WorkStatus,
}

/// Which template tasks to instantiate
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "task_template_ids", rename_all = "snake_case")]
pub enum TaskSelection {
    #[default]
    All,
    Only(Vec<Uuid>),
}

impl TaskSelection {
    pub fn includes(&self, task_template_id: Uuid) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&task_template_id),
        }
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignSummary {
    #[serde(flatten)]
    pub campaign: ClientCampaign,
    pub template_name: String,
    pub type_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubtaskView {
    #[serde(flatten)]
    pub subtask: CampaignSubtask,
    pub template: SubtaskTemplate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: CampaignTask,
    pub template: TaskTemplate,
    pub subtasks: Vec<SubtaskView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignDetail {
    pub campaign: ClientCampaign,
    pub template: CampaignTemplate,
    pub campaign_type: CampaignType,
    pub tasks: Vec<TaskView>,
}
