//! Tenant context commands

use super::ApiClient;
use crate::{output::OutputFormat, ContextCommands};
use colored::Colorize;
use portal_access::Sid;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextState {
    pub sid: Option<Sid>,
    #[serde(default)]
    pub previous_sid: Option<Sid>,
}

pub async fn handle(action: ContextCommands, client: &ApiClient, format: OutputFormat) -> Result<(), String> {
    match action {
        ContextCommands::Show => {
            let state: ContextState = client.get("/api/context").await?;
            match (format, &state.sid) {
                (OutputFormat::Table, Some(sid)) => println!("Current SID: {}", sid.to_string().bold()),
                (OutputFormat::Table, None) => println!("No client account selected"),
                _ => format.print(&state),
            }
        }
        ContextCommands::Set { sid } => {
            let sid = Sid::parse(sid).ok_or("SID must not be empty")?;
            let state: ContextState = client.put("/api/context", &json!({ "sid": sid })).await?;
            match state.previous_sid {
                Some(previous) => println!("{} Switched from {} to {}", "✓".green(), previous, sid),
                None => println!("{} Switched to {}", "✓".green(), sid),
            }
        }
        ContextCommands::Clear => {
            let state: ContextState = client.delete("/api/context").await?;
            match state.previous_sid {
                Some(previous) => println!("{} Left {}", "✓".green(), previous),
                None => println!("No client account was selected"),
            }
        }
    }
    Ok(())
}
