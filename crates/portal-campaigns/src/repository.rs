//! Campaign persistence

use crate::model::{
    CampaignStatus, CampaignSubtask, CampaignTask, CampaignTemplate, CampaignType, ClientCampaign, SubtaskTemplate,
    TaskTemplate, WorkStatus,
};
use async_trait::async_trait;
use dashmap::DashMap;
use portal_access::{BackendError, BackendResult, Sid};
use uuid::Uuid;

/// Campaign catalogue and per-client campaign tables
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn types(&self) -> BackendResult<Vec<CampaignType>>;
    async fn campaign_type(&self, type_id: Uuid) -> BackendResult<Option<CampaignType>>;
    /// Templates of a type, ordered by name
    async fn templates(&self, type_id: Uuid) -> BackendResult<Vec<CampaignTemplate>>;
    async fn template(&self, template_id: Uuid) -> BackendResult<Option<CampaignTemplate>>;
    /// Task templates, ordered by display order
    async fn task_templates(&self, template_id: Uuid) -> BackendResult<Vec<TaskTemplate>>;
    async fn subtask_templates(&self, task_template_id: Uuid) -> BackendResult<Vec<SubtaskTemplate>>;

    async fn insert_campaign(&self, campaign: ClientCampaign) -> BackendResult<()>;
    async fn campaign(&self, campaign_id: Uuid) -> BackendResult<Option<ClientCampaign>>;
    /// Campaigns for an account, newest first
    async fn campaigns(&self, sid: &Sid) -> BackendResult<Vec<ClientCampaign>>;
    async fn set_campaign_status(&self, campaign_id: Uuid, status: CampaignStatus) -> BackendResult<()>;

    async fn insert_tasks(&self, tasks: Vec<CampaignTask>) -> BackendResult<()>;
    async fn insert_subtasks(&self, subtasks: Vec<CampaignSubtask>) -> BackendResult<()>;
    /// Tasks of a campaign in creation order
    async fn tasks(&self, campaign_id: Uuid) -> BackendResult<Vec<CampaignTask>>;
    async fn task(&self, task_id: Uuid) -> BackendResult<Option<CampaignTask>>;
    async fn subtasks(&self, task_id: Uuid) -> BackendResult<Vec<CampaignSubtask>>;
    async fn subtask(&self, subtask_id: Uuid) -> BackendResult<Option<CampaignSubtask>>;
    async fn set_task_status(&self, task_id: Uuid, status: WorkStatus) -> BackendResult<()>;
    async fn set_subtask_status(&self, subtask_id: Uuid, status: WorkStatus) -> BackendResult<()>;
}

/// In-memory campaign tables
#[derive(Default)]
pub struct InMemoryCampaignRepository {
    types: DashMap<Uuid, CampaignType>,
    templates: DashMap<Uuid, CampaignTemplate>,
    task_templates: DashMap<Uuid, TaskTemplate>,
    subtask_templates: DashMap<Uuid, SubtaskTemplate>,
    campaigns: DashMap<Uuid, ClientCampaign>,
    tasks: DashMap<Uuid, (u64, CampaignTask)>,
    subtasks: DashMap<Uuid, (u64, CampaignSubtask)>,
    sequence: std::sync::atomic::AtomicU64,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&self, name: &str, description: &str) -> Uuid {
        let type_id = Uuid::new_v4();
        self.types.insert(
            type_id,
            CampaignType {
                type_id,
                name: name.to_string(),
                description: description.to_string(),
            },
        );
        type_id
    }

    pub fn add_template(&self, type_id: Uuid, name: &str, description: &str) -> Uuid {
        let template_id = Uuid::new_v4();
        self.templates.insert(
            template_id,
            CampaignTemplate {
                template_id,
                type_id,
                name: name.to_string(),
                description: description.to_string(),
            },
        );
        template_id
    }

    pub fn add_task_template(&self, template_id: Uuid, name: &str, display_order: u32) -> Uuid {
        let task_template_id = Uuid::new_v4();
        self.task_templates.insert(
            task_template_id,
            TaskTemplate {
                task_template_id,
                template_id,
                name: name.to_string(),
                description: String::new(),
                display_order,
            },
        );
        task_template_id
    }

    pub fn add_subtask_template(&self, task_template_id: Uuid, name: &str, display_order: u32) -> Uuid {
        let subtask_template_id = Uuid::new_v4();
        self.subtask_templates.insert(
            subtask_template_id,
            SubtaskTemplate {
                subtask_template_id,
                task_template_id,
                name: name.to_string(),
                description: String::new(),
                display_order,
            },
        );
        subtask_template_id
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn types(&self) -> BackendResult<Vec<CampaignType>> {
        let mut types: Vec<_> = self.types.iter().map(|t| t.value().clone()).collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn campaign_type(&self, type_id: Uuid) -> BackendResult<Option<CampaignType>> {
        Ok(self.types.get(&type_id).map(|t| t.value().clone()))
    }

    async fn templates(&self, type_id: Uuid) -> BackendResult<Vec<CampaignTemplate>> {
        let mut templates: Vec<_> = self
            .templates
            .iter()
            .filter(|t| t.type_id == type_id)
            .map(|t| t.value().clone())
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn template(&self, template_id: Uuid) -> BackendResult<Option<CampaignTemplate>> {
        Ok(self.templates.get(&template_id).map(|t| t.value().clone()))
    }

    async fn task_templates(&self, template_id: Uuid) -> BackendResult<Vec<TaskTemplate>> {
        let mut tasks: Vec<_> = self
            .task_templates
            .iter()
            .filter(|t| t.template_id == template_id)
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.display_order);
        Ok(tasks)
    }

    async fn subtask_templates(&self, task_template_id: Uuid) -> BackendResult<Vec<SubtaskTemplate>> {
        let mut subtasks: Vec<_> = self
            .subtask_templates
            .iter()
            .filter(|t| t.task_template_id == task_template_id)
            .map(|t| t.value().clone())
            .collect();
        subtasks.sort_by_key(|t| t.display_order);
        Ok(subtasks)
    }

    async fn insert_campaign(&self, campaign: ClientCampaign) -> BackendResult<()> {
        self.campaigns.insert(campaign.campaign_id, campaign);
        Ok(())
    }

    async fn campaign(&self, campaign_id: Uuid) -> BackendResult<Option<ClientCampaign>> {
        Ok(self.campaigns.get(&campaign_id).map(|c| c.value().clone()))
    }

    async fn campaigns(&self, sid: &Sid) -> BackendResult<Vec<ClientCampaign>> {
        let mut campaigns: Vec<_> = self
            .campaigns
            .iter()
            .filter(|c| &c.sid == sid)
            .map(|c| c.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    async fn set_campaign_status(&self, campaign_id: Uuid, status: CampaignStatus) -> BackendResult<()> {
        let mut campaign = self
            .campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| BackendError::NotFound(format!("client_campaigns {}", campaign_id)))?;
        campaign.status = status;
        Ok(())
    }

    async fn insert_tasks(&self, tasks: Vec<CampaignTask>) -> BackendResult<()> {
        for task in tasks {
            let seq = self.next_seq();
            self.tasks.insert(task.task_id, (seq, task));
        }
        Ok(())
    }

    async fn insert_subtasks(&self, subtasks: Vec<CampaignSubtask>) -> BackendResult<()> {
        for subtask in subtasks {
            let seq = self.next_seq();
            self.subtasks.insert(subtask.subtask_id, (seq, subtask));
        }
        Ok(())
    }

    async fn tasks(&self, campaign_id: Uuid) -> BackendResult<Vec<CampaignTask>> {
        let mut tasks: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.1.campaign_id == campaign_id)
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by_key(|(seq, _)| *seq);
        Ok(tasks.into_iter().map(|(_, t)| t).collect())
    }

    async fn task(&self, task_id: Uuid) -> BackendResult<Option<CampaignTask>> {
        Ok(self.tasks.get(&task_id).map(|t| t.1.clone()))
    }

    async fn subtasks(&self, task_id: Uuid) -> BackendResult<Vec<CampaignSubtask>> {
        let mut subtasks: Vec<_> = self
            .subtasks
            .iter()
            .filter(|s| s.1.task_id == task_id)
            .map(|s| s.value().clone())
            .collect();
        subtasks.sort_by_key(|(seq, _)| *seq);
        Ok(subtasks.into_iter().map(|(_, s)| s).collect())
    }

    async fn subtask(&self, subtask_id: Uuid) -> BackendResult<Option<CampaignSubtask>> {
        Ok(self.subtasks.get(&subtask_id).map(|s| s.1.clone()))
    }

    async fn set_task_status(&self, task_id: Uuid, status: WorkStatus) -> BackendResult<()> {
        let mut task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| BackendError::NotFound(format!("client_campaign_tasks {}", task_id)))?;
        task.1.status = status;
        Ok(())
    }

    async fn set_subtask_status(&self, subtask_id: Uuid, status: WorkStatus) -> BackendResult<()> {
        let mut subtask = self
            .subtasks
            .get_mut(&subtask_id)
            .ok_or_else(|| BackendError::NotFound(format!("client_campaign_subtasks {}", subtask_id)))?;
        subtask.1.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalogue_ordering() {
        let repo = InMemoryCampaignRepository::new();
        let social = repo.add_type("Social", "Paid and organic social");
        repo.add_template(social, "Summer Promo", "");
        repo.add_template(social, "Always On", "");
        let tpl = repo.add_template(social, "Launch", "");
        repo.add_task_template(tpl, "Report", 3);
        repo.add_task_template(tpl, "Brief", 1);
        repo.add_task_template(tpl, "Creative", 2);

        let names: Vec<_> = repo.templates(social).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Always On", "Launch", "Summer Promo"]);

        let tasks: Vec<_> = repo.task_templates(tpl).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(tasks, vec!["Brief", "Creative", "Report"]);
    }

    #[tokio::test]
    async fn test_missing_rows_report_not_found() {
        let repo = InMemoryCampaignRepository::new();
        let err = repo.set_task_status(Uuid::new_v4(), WorkStatus::Completed).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
        assert!(repo.campaign(Uuid::new_v4()).await.unwrap().is_none());
    }
}
