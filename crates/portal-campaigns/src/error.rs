//! Campaign errors

use crate::model::CampaignStatus;
use portal_access::BackendError;
use thiserror::Error;
use uuid::Uuid;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("task template {0} does not belong to the campaign template")]
    ForeignTaskTemplate(Uuid),

    #[error("no tasks selected")]
    EmptySelection,

    #[error("cannot move campaign from {from} to {to}")]
    InvalidTransition { from: CampaignStatus, to: CampaignStatus },

    #[error("campaign data unavailable: {0}")]
    Backend(#[from] BackendError),
}

impl CampaignError {
    pub fn not_found(what: &str, id: Uuid) -> Self {
        Self::NotFound(format!("{} {}", what, id))
    }
}
