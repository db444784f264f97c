//! API errors

use crate::models::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal_access::{BackendError, TenantContextError};
use portal_campaigns::CampaignError;
use portal_projects::ProjectError;
use thiserror::Error;

/// Path the client is sent to after a rejected tenant switch
pub const UNAUTHORIZED_REDIRECT: &str = "/unauthorized";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidTenant(#[from] TenantContextError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidTenant(_) => (StatusCode::FORBIDDEN, "INVALID_TENANT"),
            Self::Backend(BackendError::Denied(_)) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Backend(BackendError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Backend(_) => (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = ApiResponse::<()>::error(code, &self.to_string());
        if let (Self::InvalidTenant(_), Some(error)) = (&self, body.error.as_mut()) {
            error.redirect = Some(UNAUTHORIZED_REDIRECT.to_string());
        }
        (status, Json(body)).into_response()
    }
}

impl From<ProjectError> for ApiError {
    fn from(e: ProjectError) -> Self {
        match e {
            ProjectError::EmptyNote => Self::BadRequest(e.to_string()),
            ProjectError::UnknownMilestone(_) => Self::NotFound(e.to_string()),
            ProjectError::Backend(inner) => Self::Backend(inner),
        }
    }
}

impl From<CampaignError> for ApiError {
    fn from(e: CampaignError) -> Self {
        match e {
            CampaignError::NotFound(_) => Self::NotFound(e.to_string()),
            CampaignError::ForeignTaskTemplate(_) | CampaignError::EmptySelection => Self::BadRequest(e.to_string()),
            CampaignError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            CampaignError::Backend(inner) => Self::Backend(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_access::ValidationFailure;

    #[test]
    fn test_status_mapping() {
        let invalid = ApiError::InvalidTenant(TenantContextError::InvalidTenant {
            sid: "SID-1".into(),
            attempts: 3,
            failure: ValidationFailure::NotLinked,
        });
        assert_eq!(invalid.status_and_code().0, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Backend(BackendError::Unavailable("x".into())).status_and_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(CampaignError::EmptySelection).status_and_code().0,
            StatusCode::BAD_REQUEST
        );
    }
}
