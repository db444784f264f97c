//! Agency Client Portal API Backend
//!
//! Axum API for agency staff and client users: account settings, tenant
//! context, Project 2025 tracker, campaigns and the access log.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use portal_access::AccessServices;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod seed;
mod state;

use config::PortalConfig;
use handlers::*;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))

        // Auth
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))

        // Settings
        .route("/api/settings", get(list_settings))
        .route("/api/settings/:sid/select", post(select_setting))

        // Tenant context
        .route("/api/context", get(get_context).put(put_context).delete(delete_context))

        // Clients
        .route("/api/clients/:sid", get(client_dashboard))
        .route("/api/clients/:sid/package", put(update_package))
        .route("/api/clients/:sid/config", get(get_client_config).put(put_client_config))

        // Project 2025
        .route("/api/clients/:sid/project-2025", get(project_board))
        .route(
            "/api/clients/:sid/project-2025/milestones/:milestone_id/notes",
            get(list_notes).post(add_note),
        )

        // Campaigns
        .route("/api/campaigns/types", get(list_campaign_types))
        .route("/api/campaigns/types/:type_id/templates", get(list_templates))
        .route("/api/campaigns/templates/:template_id/tasks", get(list_task_templates))
        .route("/api/clients/:sid/campaigns", get(list_campaigns).post(create_campaign))
        .route("/api/clients/:sid/campaigns/:campaign_id", get(campaign_detail))
        .route("/api/clients/:sid/campaigns/:campaign_id/status", put(set_campaign_status))
        .route("/api/clients/:sid/tasks/:task_id/status", put(set_task_status))
        .route("/api/clients/:sid/subtasks/:subtask_id/status", put(set_subtask_status))

        // Admin
        .route("/api/admin/project-2025/notes", delete(reset_notes))
        .route("/api/admin/audit", get(list_audit))

        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Portal API v{}", env!("CARGO_PKG_VERSION"));

    let config = PortalConfig::from_env();
    let addr = config.listen_addr.clone();

    let demo = seed::demo();
    tracing::info!(agency = %demo.agency, client = %demo.client, "seeded demo accounts");

    let services = AccessServices::new(demo.backend.clone(), demo.backend.clone());
    let state = AppState::new(config, services, demo.projects, demo.campaigns);
    let app = router(state);

    tracing::info!("Portal API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
