//! Project 2025 maintenance commands

use super::ApiClient;
use crate::NotesCommands;
use colored::Colorize;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PurgeResponse {
    removed: usize,
}

pub async fn handle(action: NotesCommands, client: &ApiClient) -> Result<(), String> {
    match action {
        NotesCommands::Reset { yes } => {
            if !yes {
                return Err("refusing to delete every milestone note without --yes".into());
            }
            let purge: PurgeResponse = client.delete("/api/admin/project-2025/notes").await?;
            println!("{} Removed {} milestone note(s)", "✓".green(), purge.removed);
        }
    }
    Ok(())
}
