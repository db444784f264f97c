//! Campaign service
//!
//! Every per-client operation is scoped to a SID. A campaign, task or
//! subtask owned by a different account is reported as not found.

use crate::error::{CampaignError, CampaignResult};
use crate::model::{
    CampaignDetail, CampaignStatus, CampaignSubtask, CampaignSummary, CampaignTask, CampaignTemplate, CampaignType,
    ClientCampaign, SubtaskView, TaskSelection, TaskTemplate, TaskView, WorkStatus,
};
use crate::repository::CampaignRepository;
use chrono::Utc;
use portal_access::{AuditCategory, AuditDetails, AuditEntry, AuditLogger, AuthContext, Sid};
use std::sync::Arc;
use uuid::Uuid;

pub struct CampaignService {
    repo: Arc<dyn CampaignRepository>,
    audit: AuditLogger,
}

impl CampaignService {
    pub fn new(repo: Arc<dyn CampaignRepository>, audit: AuditLogger) -> Self {
        Self { repo, audit }
    }

    pub async fn types(&self) -> CampaignResult<Vec<CampaignType>> {
        Ok(self.repo.types().await?)
    }

    pub async fn templates(&self, type_id: Uuid) -> CampaignResult<Vec<CampaignTemplate>> {
        Ok(self.repo.templates(type_id).await?)
    }

    pub async fn task_templates(&self, template_id: Uuid) -> CampaignResult<Vec<TaskTemplate>> {
        Ok(self.repo.task_templates(template_id).await?)
    }

    /// Create a draft campaign with pending tasks and subtasks
    pub async fn create(
        &self,
        sid: &Sid,
        template_id: Uuid,
        selection: TaskSelection,
    ) -> CampaignResult<ClientCampaign> {
        match self.instantiate(sid, template_id, &selection).await {
            Ok(campaign) => {
                tracing::info!(sid = %sid, campaign_id = %campaign.campaign_id, "campaign created");
                self.audit
                    .log(
                        AuditEntry::info("create_campaign", AuditCategory::Campaigns)
                            .details(AuditDetails::Campaign {
                                sid: sid.clone(),
                                campaign_id: campaign.campaign_id,
                            })
                            .context(AuthContext::Tenant(sid.clone())),
                    )
                    .await;
                Ok(campaign)
            }
            Err(e) => {
                tracing::warn!(sid = %sid, template_id = %template_id, error = %e, "campaign creation failed");
                self.audit
                    .log(
                        AuditEntry::error("create_campaign_error", AuditCategory::Campaigns)
                            .details(AuditDetails::Failure {
                                sid: Some(sid.clone()),
                                error: e.to_string(),
                            })
                            .context(AuthContext::Tenant(sid.clone())),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn instantiate(
        &self,
        sid: &Sid,
        template_id: Uuid,
        selection: &TaskSelection,
    ) -> CampaignResult<ClientCampaign> {
        if self.repo.template(template_id).await?.is_none() {
            return Err(CampaignError::not_found("template", template_id));
        }

        let task_templates = self.repo.task_templates(template_id).await?;
        if let TaskSelection::Only(ids) = selection {
            if ids.is_empty() {
                return Err(CampaignError::EmptySelection);
            }
            if let Some(foreign) = ids
                .iter()
                .find(|id| !task_templates.iter().any(|t| t.task_template_id == **id))
            {
                return Err(CampaignError::ForeignTaskTemplate(*foreign));
            }
        }

        let campaign = ClientCampaign::draft(sid.clone(), template_id);
        self.repo.insert_campaign(campaign.clone()).await?;

        let mut tasks = Vec::new();
        let mut subtasks = Vec::new();
        for template in task_templates.iter().filter(|t| selection.includes(t.task_template_id)) {
            let task = CampaignTask {
                task_id: Uuid::new_v4(),
                campaign_id: campaign.campaign_id,
                task_template_id: template.task_template_id,
                status: WorkStatus::Pending,
                created_at: Utc::now(),
            };
            for sub in self.repo.subtask_templates(template.task_template_id).await? {
                subtasks.push(CampaignSubtask {
                    subtask_id: Uuid::new_v4(),
                    task_id: task.task_id,
                    subtask_template_id: sub.subtask_template_id,
                    status: WorkStatus::Pending,
                });
            }
            tasks.push(task);
        }

        self.repo.insert_tasks(tasks).await?;
        self.repo.insert_subtasks(subtasks).await?;
        Ok(campaign)
    }

    /// Campaigns for an account, newest first
    pub async fn list(&self, sid: &Sid) -> CampaignResult<Vec<CampaignSummary>> {
        let campaigns = self.repo.campaigns(sid).await?;
        let mut summaries = Vec::with_capacity(campaigns.len());
        for campaign in campaigns {
            let (template_name, type_name) = match self.repo.template(campaign.template_id).await? {
                Some(template) => {
                    let type_name = self
                        .repo
                        .campaign_type(template.type_id)
                        .await?
                        .map(|t| t.name)
                        .unwrap_or_default();
                    (template.name, type_name)
                }
                None => (String::new(), String::new()),
            };
            summaries.push(CampaignSummary {
                campaign,
                template_name,
                type_name,
            });
        }
        Ok(summaries)
    }

    pub async fn detail(&self, sid: &Sid, campaign_id: Uuid) -> CampaignResult<CampaignDetail> {
        let campaign = self.owned_campaign(sid, campaign_id).await?;
        let template = self
            .repo
            .template(campaign.template_id)
            .await?
            .ok_or_else(|| CampaignError::not_found("template", campaign.template_id))?;
        let campaign_type = self
            .repo
            .campaign_type(template.type_id)
            .await?
            .ok_or_else(|| CampaignError::not_found("campaign type", template.type_id))?;

        let task_templates = self.repo.task_templates(template.template_id).await?;
        let mut tasks = Vec::new();
        for task in self.repo.tasks(campaign_id).await? {
            let Some(task_template) = task_templates
                .iter()
                .find(|t| t.task_template_id == task.task_template_id)
                .cloned()
            else {
                tracing::warn!(task_id = %task.task_id, "task template missing, skipping task");
                continue;
            };

            let subtask_templates = self.repo.subtask_templates(task.task_template_id).await?;
            let subtasks = self
                .repo
                .subtasks(task.task_id)
                .await?
                .into_iter()
                .filter_map(|subtask| {
                    subtask_templates
                        .iter()
                        .find(|t| t.subtask_template_id == subtask.subtask_template_id)
                        .cloned()
                        .map(|template| SubtaskView { subtask, template })
                })
                .collect();

            tasks.push(TaskView {
                task,
                template: task_template,
                subtasks,
            });
        }

        Ok(CampaignDetail {
            campaign,
            template,
            campaign_type,
            tasks,
        })
    }

    pub async fn set_task_status(&self, sid: &Sid, task_id: Uuid, status: WorkStatus) -> CampaignResult<()> {
        let task = self
            .repo
            .task(task_id)
            .await?
            .ok_or_else(|| CampaignError::not_found("task", task_id))?;
        self.owned_campaign(sid, task.campaign_id)
            .await
            .map_err(|_| CampaignError::not_found("task", task_id))?;

        self.repo.set_task_status(task_id, status).await?;
        self.log_item_status("update_task_status", sid, task_id, status.as_str()).await;
        Ok(())
    }

    pub async fn set_subtask_status(&self, sid: &Sid, subtask_id: Uuid, status: WorkStatus) -> CampaignResult<()> {
        let missing = || CampaignError::not_found("subtask", subtask_id);

        let subtask = self.repo.subtask(subtask_id).await?.ok_or_else(missing)?;
        let task = self.repo.task(subtask.task_id).await?.ok_or_else(missing)?;
        self.owned_campaign(sid, task.campaign_id).await.map_err(|_| missing())?;

        self.repo.set_subtask_status(subtask_id, status).await?;
        self.log_item_status("update_subtask_status", sid, subtask_id, status.as_str()).await;
        Ok(())
    }

    pub async fn set_campaign_status(
        &self,
        sid: &Sid,
        campaign_id: Uuid,
        status: CampaignStatus,
    ) -> CampaignResult<ClientCampaign> {
        let mut campaign = self.owned_campaign(sid, campaign_id).await?;
        campaign.transition(status)?;

        self.repo.set_campaign_status(campaign_id, status).await?;
        self.log_item_status("update_campaign_status", sid, campaign_id, status.as_str()).await;
        Ok(campaign)
    }

    async fn owned_campaign(&self, sid: &Sid, campaign_id: Uuid) -> CampaignResult<ClientCampaign> {
        match self.repo.campaign(campaign_id).await? {
            Some(campaign) if &campaign.sid == sid => Ok(campaign),
            _ => Err(CampaignError::not_found("campaign", campaign_id)),
        }
    }

    async fn log_item_status(&self, action: &str, sid: &Sid, item_id: Uuid, status: &str) {
        self.audit
            .log(
                AuditEntry::info(action, AuditCategory::Campaigns)
                    .details(AuditDetails::CampaignItemStatus {
                        sid: sid.clone(),
                        item_id,
                        status: status.to_string(),
                    })
                    .context(AuthContext::Tenant(sid.clone())),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCampaignRepository;
    use portal_access::{InMemoryBackend, StaticIdentity};

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        service: CampaignService,
        template: Uuid,
        tasks: Vec<Uuid>,
        sid: Sid,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryCampaignRepository::new());
        let social = repo.add_type("Social", "Paid social");
        let template = repo.add_template(social, "Product Launch", "Four week launch");
        let brief = repo.add_task_template(template, "Brief", 1);
        let creative = repo.add_task_template(template, "Creative", 2);
        let report = repo.add_task_template(template, "Report", 3);
        repo.add_subtask_template(creative, "Static ads", 1);
        repo.add_subtask_template(creative, "Video cut", 2);

        let backend = Arc::new(InMemoryBackend::new());
        let audit = AuditLogger::new(
            Arc::new(StaticIdentity::signed_in(Uuid::new_v4())),
            backend.clone(),
            backend.clone(),
        );
        Fixture {
            backend,
            service: CampaignService::new(repo, audit),
            template,
            tasks: vec![brief, creative, report],
            sid: "SID-7".into(),
        }
    }

    #[tokio::test]
    async fn test_create_all_tasks() {
        let f = fixture();
        let campaign = f.service.create(&f.sid, f.template, TaskSelection::All).await.unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);

        let detail = f.service.detail(&f.sid, campaign.campaign_id).await.unwrap();
        assert_eq!(detail.template.name, "Product Launch");
        assert_eq!(detail.campaign_type.name, "Social");
        let names: Vec<_> = detail.tasks.iter().map(|t| t.template.name.as_str()).collect();
        assert_eq!(names, vec!["Brief", "Creative", "Report"]);
        assert!(detail.tasks.iter().all(|t| t.task.status == WorkStatus::Pending));
        assert_eq!(detail.tasks[1].subtasks.len(), 2);

        let records = f.backend.audit_records();
        assert_eq!(records.last().unwrap().action, "create_campaign");
    }

    #[tokio::test]
    async fn test_create_selected_tasks() {
        let f = fixture();
        let campaign = f
            .service
            .create(&f.sid, f.template, TaskSelection::Only(vec![f.tasks[0], f.tasks[2]]))
            .await
            .unwrap();
        let detail = f.service.detail(&f.sid, campaign.campaign_id).await.unwrap();
        let names: Vec<_> = detail.tasks.iter().map(|t| t.template.name.as_str()).collect();
        assert_eq!(names, vec!["Brief", "Report"]);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_and_empty_selection() {
        let f = fixture();
        let stray = Uuid::new_v4();
        let err = f
            .service
            .create(&f.sid, f.template, TaskSelection::Only(vec![stray]))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::ForeignTaskTemplate(id) if id == stray));

        let err = f
            .service
            .create(&f.sid, f.template, TaskSelection::Only(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::EmptySelection));

        assert!(f.service.list(&f.sid).await.unwrap().is_empty());
        assert_eq!(f.backend.audit_records().last().unwrap().action, "create_campaign_error");
    }

    #[tokio::test]
    async fn test_other_tenant_sees_not_found() {
        let f = fixture();
        let campaign = f.service.create(&f.sid, f.template, TaskSelection::All).await.unwrap();
        let other: Sid = "SID-8".into();

        assert!(matches!(
            f.service.detail(&other, campaign.campaign_id).await,
            Err(CampaignError::NotFound(_))
        ));
        assert!(f.service.list(&other).await.unwrap().is_empty());

        let detail = f.service.detail(&f.sid, campaign.campaign_id).await.unwrap();
        let task_id = detail.tasks[0].task.task_id;
        assert!(matches!(
            f.service.set_task_status(&other, task_id, WorkStatus::Completed).await,
            Err(CampaignError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_task_and_subtask_status_updates() {
        let f = fixture();
        let campaign = f.service.create(&f.sid, f.template, TaskSelection::All).await.unwrap();
        let detail = f.service.detail(&f.sid, campaign.campaign_id).await.unwrap();
        let task_id = detail.tasks[1].task.task_id;
        let subtask_id = detail.tasks[1].subtasks[0].subtask.subtask_id;

        f.service.set_task_status(&f.sid, task_id, WorkStatus::InProgress).await.unwrap();
        f.service
            .set_subtask_status(&f.sid, subtask_id, WorkStatus::Completed)
            .await
            .unwrap();

        let detail = f.service.detail(&f.sid, campaign.campaign_id).await.unwrap();
        assert_eq!(detail.tasks[1].task.status, WorkStatus::InProgress);
        assert_eq!(detail.tasks[1].subtasks[0].subtask.status, WorkStatus::Completed);
        assert_eq!(f.backend.audit_records().last().unwrap().action, "update_subtask_status");
    }

    #[tokio::test]
    async fn test_campaign_status_transitions() {
        let f = fixture();
        let campaign = f.service.create(&f.sid, f.template, TaskSelection::All).await.unwrap();
        let id = campaign.campaign_id;

        assert!(matches!(
            f.service.set_campaign_status(&f.sid, id, CampaignStatus::Completed).await,
            Err(CampaignError::InvalidTransition { .. })
        ));
        f.service.set_campaign_status(&f.sid, id, CampaignStatus::Active).await.unwrap();
        f.service.set_campaign_status(&f.sid, id, CampaignStatus::Completed).await.unwrap();
        assert!(matches!(
            f.service.set_campaign_status(&f.sid, id, CampaignStatus::Cancelled).await,
            Err(CampaignError::InvalidTransition { .. })
        ));

        let listed = f.service.list(&f.sid).await.unwrap();
        assert_eq!(listed[0].campaign.status, CampaignStatus::Completed);
        assert_eq!(listed[0].template_name, "Product Launch");
        assert_eq!(listed[0].type_name, "Social");
    }
}
