//! Demo data for the in-memory backend

use crate::auth::password_digest;
use portal_access::{Account, InMemoryBackend, Role, Setting, SettingStatus, Sid};
use portal_campaigns::InMemoryCampaignRepository;
use portal_projects::{InMemoryProjectRepository, ProjectRecord};
use std::sync::Arc;
use uuid::Uuid;

pub const AGENCY_EMAIL: &str = "admin@agency.example";
pub const AGENCY_PASSWORD: &str = "agency-admin";
pub const CLIENT_EMAIL: &str = "owner@brightsmile.example";
pub const CLIENT_PASSWORD: &str = "client-demo";

pub struct DemoData {
    pub backend: Arc<InMemoryBackend>,
    pub projects: Arc<InMemoryProjectRepository>,
    pub campaigns: Arc<InMemoryCampaignRepository>,
    pub agency: Uuid,
    pub client: Uuid,
}

pub fn demo() -> DemoData {
    let backend = Arc::new(InMemoryBackend::new());
    let agency = Uuid::new_v4();
    let client = Uuid::new_v4();

    backend.add_account(Account {
        actor_id: agency,
        email: AGENCY_EMAIL.into(),
        password_digest: password_digest(AGENCY_PASSWORD),
        role: Role::Agency,
    });
    backend.add_account(Account {
        actor_id: client,
        email: CLIENT_EMAIL.into(),
        password_digest: password_digest(CLIENT_PASSWORD),
        role: Role::Client,
    });

    let settings = [
        ("SID-1001", "Bright Smile Dental", "Growth", SettingStatus::Active),
        ("SID-1002", "Harbour Physio", "Starter", SettingStatus::Active),
        ("SID-1003", "Northside Vets", "Premium", SettingStatus::Suspended),
        ("SID-1004", "Oak Lane Bakery", "Starter", SettingStatus::Pending),
    ];
    for (sid, name, package, status) in settings {
        let sid: Sid = sid.into();
        backend.insert_setting(Setting::new(sid.clone(), name, package, status));
        backend.link(&sid, agency);
    }
    backend.link(&"SID-1001".into(), client);

    for resource in ["client_settings", "project_2025", "campaigns"] {
        backend.grant(client, resource, "read");
    }
    backend.grant(client, "campaigns", "write");

    let projects = Arc::new(InMemoryProjectRepository::standard());
    projects.put_record(
        ProjectRecord::new("SID-1001".into())
            .with(1, "Y")
            .with(2, "Y")
            .with(3, "Y")
            .with(6, "Logo pack and fonts received")
            .with(8, "Yes - Active")
            .with(19, "Meeting Booked"),
    );

    let campaigns = Arc::new(InMemoryCampaignRepository::new());
    let social = campaigns.add_type("Social", "Paid and organic social media");
    let launch = campaigns.add_template(social, "Product Launch", "Four week launch push");
    campaigns.add_task_template(launch, "Campaign brief", 1);
    let creative = campaigns.add_task_template(launch, "Creative production", 2);
    campaigns.add_subtask_template(creative, "Static ads", 1);
    campaigns.add_subtask_template(creative, "Short video", 2);
    campaigns.add_task_template(launch, "Performance report", 3);

    let email = campaigns.add_type("Email", "Newsletters and automated flows");
    let welcome = campaigns.add_template(email, "Welcome Series", "Three-step onboarding flow");
    campaigns.add_task_template(welcome, "Copywriting", 1);
    campaigns.add_task_template(welcome, "Flow build", 2);

    DemoData {
        backend,
        projects,
        campaigns,
        agency,
        client,
    }
}
