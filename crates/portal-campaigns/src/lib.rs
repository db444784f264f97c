//! Client Campaigns
//!
//! Campaign types group templates; a template defines ordered tasks, and a
//! task template defines subtasks. Creating a campaign for an account copies
//! the chosen tasks and their subtasks as pending work items.
//!
//! ## Lifecycle
//! - `draft` → `active` → `completed`
//! - `draft` | `active` → `cancelled`

pub mod error;
pub mod model;
pub mod repository;
pub mod service;

pub use error::{CampaignError, CampaignResult};
pub use model::{
    CampaignDetail, CampaignStatus, CampaignSubtask, CampaignSummary, CampaignTask, CampaignTemplate, CampaignType,
    ClientCampaign, SubtaskTemplate, SubtaskView, TaskSelection, TaskTemplate, TaskView, WorkStatus,
};
pub use repository::{CampaignRepository, InMemoryCampaignRepository};
pub use service::CampaignService;
