//! API Handlers

use crate::auth::{create_token, password_digest, AuthUser};
use crate::error::ApiError;
use crate::models::*;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use portal_access::{
    AuditCategory, AuditDetails, AuditEntry, AuditQuery, AuditRecord, AuthContext, AuthHints, BackendResult,
    ClientConfig, Operation, Resource, Setting, Sid, TenantContextError,
};
use portal_campaigns::{
    CampaignDetail, CampaignSummary, CampaignTemplate, CampaignType, ClientCampaign, TaskTemplate,
};
use portal_projects::{MilestoneId, Note, ProjectBoard};
use chrono::{Duration, Utc};
use uuid::Uuid;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

const DEFAULT_AUDIT_LIMIT: usize = 100;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn parse_sid(raw: String) -> Result<Sid, ApiError> {
    Sid::parse(raw).ok_or_else(|| ApiError::BadRequest("SID must not be empty".into()))
}

/// Reject callers without a `sid_lookup` link to `sid`
async fn require_link(state: &AppState, user: &AuthUser, sid: &Sid) -> Result<(), ApiError> {
    let linked = match state.services.directory().is_linked(sid, user.actor).await {
        Ok(linked) => linked,
        Err(e) => {
            tracing::error!(sid = %sid, error = %e, "SID lookup failed");
            false
        }
    };
    if linked {
        return Ok(());
    }

    tracing::warn!(sid = %sid, actor = %user.actor, "SID access denied");
    state
        .audit(Some(user))
        .log(
            AuditEntry::warn("sid_access_denied", AuditCategory::Settings)
                .details(AuditDetails::SidAccess { sid: sid.clone() })
                .context(AuthContext::Hints(AuthHints {
                    authenticated: Some(true),
                    lookup_ok: Some(false),
                    context_valid: Some(false),
                })),
        )
        .await;
    Err(ApiError::Forbidden(format!("no access to {}", sid)))
}

async fn require_access(state: &AppState, user: &AuthUser, resource: Resource, op: Operation) -> Result<(), ApiError> {
    if state.access().check_access(Some(user.actor), resource, op).await {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "{} access to {} denied",
            op.as_str(),
            resource.as_str()
        )))
    }
}

async fn require_agency(state: &AppState, user: &AuthUser) -> Result<(), ApiError> {
    if state.access().is_agency(user.actor).await {
        Ok(())
    } else {
        Err(ApiError::Forbidden("agency access required".into()))
    }
}

/// Run the validator outside the tenant context store
async fn require_valid(state: &AppState, user: &AuthUser, sid: &Sid) -> Result<(), ApiError> {
    let outcome = state.validator(user).validate(sid).await;
    match outcome.result {
        Ok(()) => Ok(()),
        Err(failure) => Err(TenantContextError::InvalidTenant {
            sid: sid.clone(),
            attempts: outcome.attempts,
            failure,
        }
        .into()),
    }
}

async fn log_failure(state: &AppState, user: &AuthUser, action: &str, category: AuditCategory, sid: &Sid, error: &ApiError) {
    state
        .audit(Some(user))
        .log(
            AuditEntry::error(action, category)
                .details(AuditDetails::Failure {
                    sid: Some(sid.clone()),
                    error: error.to_string(),
                })
                .context(AuthContext::Tenant(sid.clone())),
        )
        .await;
}

// Health
pub async fn health() -> &'static str {
    "OK"
}

// Auth
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let email = req.email.trim();
    let account = match state.services.directory().account_by_email(email).await? {
        Some(account) if account.password_digest == password_digest(&req.password) => account,
        _ => {
            tracing::warn!(email = %email, "sign-in rejected");
            state
                .audit(None)
                .log(
                    AuditEntry::warn("sign_in_failed", AuditCategory::Session)
                        .details(AuditDetails::SignIn { email: email.to_string() }),
                )
                .await;
            return Err(ApiError::Unauthorized);
        }
    };

    let expires_at = Utc::now() + Duration::hours(state.config.token_ttl_hours);
    let session_id = state.open_session(expires_at);
    let token = create_token(
        &state.config.jwt_secret,
        expires_at,
        account.actor_id,
        session_id,
        &account.email,
        account.role,
    )
    .map_err(|e| {
        state.close_session(session_id);
        ApiError::Internal(format!("token encoding failed: {}", e))
    })?;

    let user = AuthUser {
        actor: account.actor_id,
        session_id,
        email: account.email.clone(),
        role: account.role,
    };
    tracing::info!(actor = %user.actor, "signed in");
    state
        .audit(Some(&user))
        .log(
            AuditEntry::info("sign_in", AuditCategory::Session)
                .details(AuditDetails::SignIn { email: account.email }),
        )
        .await;

    ok(LoginResponse {
        token,
        expires_at,
        role: account.role,
    })
}

pub async fn logout(State(state): State<AppState>, user: AuthUser) -> ApiResult<()> {
    state.close_session(user.session_id);
    state
        .audit(Some(&user))
        .log(
            AuditEntry::info("sign_out", AuditCategory::Session)
                .details(AuditDetails::SignOut { email: user.email.clone() }),
        )
        .await;
    ok(())
}

// Settings
async fn visible_settings(state: &AppState, user: &AuthUser) -> BackendResult<Vec<Setting>> {
    let directory = state.services.directory();
    if state.access().is_agency(user.actor).await {
        return directory.settings().await;
    }

    let mut settings = Vec::new();
    for sid in directory.linked_sids(user.actor).await? {
        if let Some(setting) = directory.setting(&sid).await? {
            settings.push(setting);
        }
    }
    settings.sort_by(|a, b| a.account_name.cmp(&b.account_name));
    Ok(settings)
}

pub async fn list_settings(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<Setting>> {
    let audit = state.audit(Some(&user));
    match visible_settings(&state, &user).await {
        Ok(settings) => {
            audit.log(AuditEntry::info("fetch_settings", AuditCategory::Settings)).await;
            ok(settings)
        }
        Err(e) => {
            audit
                .log(
                    AuditEntry::error("fetch_settings_error", AuditCategory::Settings).details(
                        AuditDetails::Failure {
                            sid: None,
                            error: e.to_string(),
                        },
                    ),
                )
                .await;
            Err(e.into())
        }
    }
}

pub async fn select_setting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
) -> ApiResult<Setting> {
    let sid = parse_sid(sid)?;
    let audit = state.audit(Some(&user));

    let directory = state.services.directory();
    let lookup = match directory.is_linked(&sid, user.actor).await {
        Ok(true) => directory.setting(&sid).await,
        Ok(false) => Ok(None),
        Err(e) => Err(e),
    };

    match lookup {
        Ok(Some(setting)) => {
            audit
                .log(
                    AuditEntry::info("select_setting", AuditCategory::Settings)
                        .details(AuditDetails::SidAccess { sid: sid.clone() })
                        .context(AuthContext::Tenant(sid)),
                )
                .await;
            ok(setting)
        }
        Ok(None) => {
            audit
                .log(
                    AuditEntry::warn("select_setting_error", AuditCategory::Settings)
                        .details(AuditDetails::SidAccess { sid: sid.clone() })
                        .context(AuthContext::Tenant(sid.clone())),
                )
                .await;
            Err(ApiError::Forbidden(format!("no access to {}", sid)))
        }
        Err(e) => {
            tracing::error!(sid = %sid, error = %e, "setting selection failed");
            audit
                .log(
                    AuditEntry::error("select_setting_error", AuditCategory::Settings)
                        .details(AuditDetails::Failure {
                            sid: Some(sid.clone()),
                            error: e.to_string(),
                        })
                        .context(AuthContext::Tenant(sid)),
                )
                .await;
            Err(e.into())
        }
    }
}

// Tenant context
pub async fn get_context(State(state): State<AppState>, user: AuthUser) -> ApiResult<ContextResponse> {
    ok(ContextResponse {
        sid: state.context(&user)?.get(),
        previous_sid: None,
    })
}

pub async fn put_context(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ContextRequest>,
) -> ApiResult<ContextResponse> {
    let sid = parse_sid(req.sid)?;
    let previous_sid = state.context(&user)?.set(sid.clone()).await?;
    ok(ContextResponse {
        sid: Some(sid),
        previous_sid,
    })
}

pub async fn delete_context(State(state): State<AppState>, user: AuthUser) -> ApiResult<ContextResponse> {
    let context = state.context(&user)?;
    let previous_sid = context.get();
    context.leave().await;
    ok(ContextResponse {
        sid: None,
        previous_sid,
    })
}

// Clients
pub async fn client_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
) -> ApiResult<ClientDashboard> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;

    let directory = state.services.directory();
    let Some(setting) = directory.setting(&sid).await? else {
        let err = ApiError::NotFound(format!("no settings row for {}", sid));
        log_failure(&state, &user, "setting_not_found", AuditCategory::Settings, &sid, &err).await;
        return Err(err);
    };

    let context = state.context(&user)?;
    if context.get().as_ref() != Some(&sid) {
        context.set(sid.clone()).await?;
        state
            .audit(Some(&user))
            .log(
                AuditEntry::info("sid_context_change", AuditCategory::Settings)
                    .details(AuditDetails::SidAccess { sid: sid.clone() })
                    .context(AuthContext::Tenant(sid.clone())),
            )
            .await;
    }

    let crm = directory.crm_client(&sid).await?;
    ok(ClientDashboard { setting, crm })
}

pub async fn update_package(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
    Json(req): Json<PackageRequest>,
) -> ApiResult<Setting> {
    let sid = parse_sid(sid)?;
    let package = req.package.trim().to_string();
    if package.is_empty() {
        return Err(ApiError::BadRequest("package must not be empty".into()));
    }
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Settings, Operation::Write).await?;

    let directory = state.services.directory();
    let setting = directory
        .setting(&sid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no settings row for {}", sid)))?;

    if let Err(e) = directory.update_package(&sid, &package).await {
        let err = ApiError::from(e);
        log_failure(&state, &user, "update_package_error", AuditCategory::Settings, &sid, &err).await;
        return Err(err);
    }

    tracing::info!(sid = %sid, package = %package, "package updated");
    state
        .audit(Some(&user))
        .log(
            AuditEntry::info("update_package", AuditCategory::Settings)
                .details(AuditDetails::PackageUpdate {
                    sid: sid.clone(),
                    old_package: setting.package.clone(),
                    new_package: package.clone(),
                })
                .context(AuthContext::Tenant(sid)),
        )
        .await;

    ok(Setting { package, ..setting })
}

pub async fn get_client_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
) -> ApiResult<ClientConfig> {
    let sid = parse_sid(sid)?;
    require_valid(&state, &user, &sid).await?;

    match state.services.directory().client_config(&sid).await {
        Ok(config) => ok(config.unwrap_or_default()),
        Err(e) => {
            let err = ApiError::from(e);
            log_failure(&state, &user, "load_settings_error", AuditCategory::ClientSettings, &sid, &err).await;
            Err(err)
        }
    }
}

pub async fn put_client_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
    Json(config): Json<ClientConfig>,
) -> ApiResult<ClientConfig> {
    let sid = parse_sid(sid)?;
    require_valid(&state, &user, &sid).await?;

    if let Err(e) = state.services.directory().save_client_config(&sid, &config).await {
        let err = ApiError::from(e);
        log_failure(&state, &user, "save_settings_error", AuditCategory::ClientSettings, &sid, &err).await;
        return Err(err);
    }

    state
        .audit(Some(&user))
        .log(
            AuditEntry::info("save_settings", AuditCategory::ClientSettings)
                .details(AuditDetails::SidAccess { sid: sid.clone() })
                .context(AuthContext::Tenant(sid)),
        )
        .await;
    ok(config)
}

// Project 2025
pub async fn project_board(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
) -> ApiResult<ProjectBoard> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Project2025, Operation::Read).await?;

    state
        .audit(Some(&user))
        .log(
            AuditEntry::info("enter_project_2025", AuditCategory::Project2025)
                .details(AuditDetails::SidAccess { sid: sid.clone() })
                .context(AuthContext::Tenant(sid.clone())),
        )
        .await;

    ok(state.tracker(&user).board(&sid).await?)
}

pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, milestone_id)): Path<(String, MilestoneId)>,
) -> ApiResult<Vec<Note>> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    ok(state.tracker(&user).notes(&sid, milestone_id).await?)
}

pub async fn add_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, milestone_id)): Path<(String, MilestoneId)>,
    Json(req): Json<NoteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Note>>), ApiError> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    let note = state.tracker(&user).add_note(&sid, milestone_id, &req.note).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(note))))
}

// Campaign catalogue
pub async fn list_campaign_types(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<CampaignType>> {
    ok(state.campaign_service(&user).types().await?)
}

pub async fn list_templates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(type_id): Path<Uuid>,
) -> ApiResult<Vec<CampaignTemplate>> {
    ok(state.campaign_service(&user).templates(type_id).await?)
}

pub async fn list_task_templates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(template_id): Path<Uuid>,
) -> ApiResult<Vec<TaskTemplate>> {
    ok(state.campaign_service(&user).task_templates(template_id).await?)
}

// Client campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
) -> ApiResult<Vec<CampaignSummary>> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Read).await?;
    ok(state.campaign_service(&user).list(&sid).await?)
}

pub async fn create_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(sid): Path<String>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ClientCampaign>>), ApiError> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Write).await?;

    let campaign = state
        .campaign_service(&user)
        .create(&sid, req.template_id, req.selection)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(campaign))))
}

pub async fn campaign_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, campaign_id)): Path<(String, Uuid)>,
) -> ApiResult<CampaignDetail> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Read).await?;
    ok(state.campaign_service(&user).detail(&sid, campaign_id).await?)
}

pub async fn set_campaign_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, campaign_id)): Path<(String, Uuid)>,
    Json(req): Json<CampaignStatusRequest>,
) -> ApiResult<ClientCampaign> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Write).await?;
    ok(state
        .campaign_service(&user)
        .set_campaign_status(&sid, campaign_id, req.status)
        .await?)
}

pub async fn set_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, task_id)): Path<(String, Uuid)>,
    Json(req): Json<WorkStatusRequest>,
) -> ApiResult<()> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Write).await?;
    ok(state.campaign_service(&user).set_task_status(&sid, task_id, req.status).await?)
}

pub async fn set_subtask_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path((sid, subtask_id)): Path<(String, Uuid)>,
    Json(req): Json<WorkStatusRequest>,
) -> ApiResult<()> {
    let sid = parse_sid(sid)?;
    require_link(&state, &user, &sid).await?;
    require_access(&state, &user, Resource::Campaigns, Operation::Write).await?;
    ok(state
        .campaign_service(&user)
        .set_subtask_status(&sid, subtask_id, req.status)
        .await?)
}

// Admin
pub async fn reset_notes(State(state): State<AppState>, user: AuthUser) -> ApiResult<PurgeResponse> {
    require_agency(&state, &user).await?;
    let removed = state.tracker(&user).reset_notes().await?;
    ok(PurgeResponse { removed })
}

pub async fn list_audit(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AuditListQuery>,
) -> ApiResult<Vec<AuditRecord>> {
    require_agency(&state, &user).await?;
    let query = AuditQuery {
        action: query.action,
        actor_id: None,
        severity: query.severity,
        limit: Some(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)),
    };
    ok(state.services.sink().query(&query).await?)
}
