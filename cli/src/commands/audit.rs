//! Audit log commands

use super::ApiClient;
use crate::{output::OutputFormat, AuditCommands};
use portal_access::AuditRecord;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Table")]
    category: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Context valid")]
    context_valid: String,
}

impl From<&AuditRecord> for AuditRow {
    fn from(r: &AuditRecord) -> Self {
        Self {
            timestamp: r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            severity: r.severity.to_string(),
            action: r.action.clone(),
            category: r.category.as_str().to_string(),
            actor: r.actor_id.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
            context_valid: match r.flags.context_valid {
                Some(true) => "yes".into(),
                Some(false) => "no".into(),
                None => "-".into(),
            },
        }
    }
}

/// Query parameters for the audit listing
fn audit_query(action: Option<&str>, severity: Option<&str>, limit: usize) -> Vec<(&'static str, String)> {
    let mut params = vec![("limit", limit.to_string())];
    if let Some(action) = action {
        params.push(("action", action.to_string()));
    }
    if let Some(severity) = severity {
        params.push(("severity", severity.to_lowercase()));
    }
    params
}

pub async fn handle(action: AuditCommands, client: &ApiClient, format: OutputFormat) -> Result<(), String> {
    match action {
        AuditCommands::List { action, severity, limit } => {
            let query = audit_query(action.as_deref(), severity.as_deref(), limit);
            let records: Vec<AuditRecord> = client.get_query("/api/admin/audit", &query).await?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<AuditRow> = records.iter().map(AuditRow::from).collect();
                    format.print_rows(&rows);
                }
                _ => format.print(&records),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_query_params() {
        assert_eq!(audit_query(None, None, 50), vec![("limit", "50".to_string())]);
        assert_eq!(
            audit_query(Some("sid_context_switch"), Some("WARN"), 10),
            vec![
                ("limit", "10".to_string()),
                ("action", "sid_context_switch".to_string()),
                ("severity", "warn".to_string()),
            ]
        );
    }

    #[test]
    fn test_audit_query_is_percent_encoded() {
        let client = ApiClient::new("http://localhost:8080", None);
        let req = client
            .request(reqwest::Method::GET, "/api/admin/audit")
            .query(&audit_query(Some("select setting&limit=1"), None, 10))
            .build()
            .unwrap();
        assert_eq!(req.url().path(), "/api/admin/audit");
        assert_eq!(req.url().query(), Some("limit=10&action=select+setting%26limit%3D1"));
    }
}
