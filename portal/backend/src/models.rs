//! API Models

use chrono::{DateTime, Utc};
use portal_access::{CrmClient, Role, Setting, Severity, Sid};
use portal_campaigns::{CampaignStatus, TaskSelection, WorkStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                redirect: None,
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Where the client should send the user next
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

// ============ Auth ============

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub role: Role,
}

// ============ Tenant context ============

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    pub sid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextResponse {
    pub sid: Option<Sid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_sid: Option<Sid>,
}

// ============ Clients ============

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientDashboard {
    pub setting: Setting,
    pub crm: Option<CrmClient>,
}

#[derive(Debug, Deserialize)]
pub struct PackageRequest {
    pub package: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub removed: usize,
}

// ============ Campaigns ============

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub template_id: Uuid,
    #[serde(default)]
    pub selection: TaskSelection,
}

#[derive(Debug, Deserialize)]
pub struct CampaignStatusRequest {
    pub status: CampaignStatus,
}

#[derive(Debug, Deserialize)]
pub struct WorkStatusRequest {
    pub status: WorkStatus,
}

// ============ Admin ============

#[derive(Debug, Default, Deserialize)]
pub struct AuditListQuery {
    pub action: Option<String>,
    pub severity: Option<Severity>,
    pub limit: Option<usize>,
}
