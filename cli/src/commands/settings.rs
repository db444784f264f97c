//! Settings commands

use super::ApiClient;
use crate::{output::OutputFormat, SettingsCommands};
use portal_access::Setting;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct SettingRow {
    #[tabled(rename = "SID")]
    sid: String,
    #[tabled(rename = "Account")]
    account_name: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<Setting> for SettingRow {
    fn from(s: Setting) -> Self {
        Self {
            sid: s.sid.to_string(),
            account_name: s.account_name,
            package: s.package,
            status: s.status.to_string(),
        }
    }
}

pub async fn handle(action: SettingsCommands, client: &ApiClient, format: OutputFormat) -> Result<(), String> {
    match action {
        SettingsCommands::List => {
            let settings: Vec<Setting> = client.get("/api/settings").await?;
            let rows: Vec<SettingRow> = settings.into_iter().map(SettingRow::from).collect();
            format.print_rows(&rows);
        }
    }
    Ok(())
}
