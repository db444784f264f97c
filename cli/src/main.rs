//! Portal Admin CLI
//!
//! Operator command line for the Agency Client Portal API.
//!
//! # Usage
//!
//! ```bash
//! portal-admin login --email admin@agency.example
//! portal-admin settings list
//! portal-admin context set SID-1001
//! portal-admin audit list --action sid_context_switch --limit 20
//! portal-admin notes reset --yes
//! ```

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "portal-admin")]
#[command(version)]
#[command(about = "Agency Client Portal administration", long_about = None)]
struct Cli {
    /// API endpoint URL
    #[arg(long, env = "PORTAL_API_URL")]
    api_url: Option<String>,

    /// Bearer token (overrides the stored session)
    #[arg(long, env = "PORTAL_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD")]
        password: String,
    },
    /// End the stored session
    Logout,
    /// Browse client accounts
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
    /// Manage the session's current client account
    Context {
        #[command(subcommand)]
        action: ContextCommands,
    },
    /// Project 2025 maintenance
    Notes {
        #[command(subcommand)]
        action: NotesCommands,
    },
    /// Inspect the access log
    Audit {
        #[command(subcommand)]
        action: AuditCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// List visible client accounts
    List,
}

#[derive(Subcommand)]
enum ContextCommands {
    /// Show the current SID
    Show,
    /// Switch to a SID (validated server-side)
    Set { sid: String },
    /// Leave the current client account
    Clear,
}

#[derive(Subcommand)]
enum NotesCommands {
    /// Delete every milestone note for every account
    Reset {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// List recent audit records, newest first
    List {
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let config = config::Config::load(profile).unwrap_or_default();
    let api_url = cli
        .api_url
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| config::DEFAULT_API_URL.to_string());
    let token = cli.token.or_else(|| config.token.clone());
    let format = cli.format.unwrap_or_else(|| config.format());

    let client = commands::ApiClient::new(&api_url, token.as_deref());

    let result = match cli.command {
        Commands::Login { email, password } => commands::auth::login(&client, profile, &email, &password).await,
        Commands::Logout => commands::auth::logout(&client, profile).await,
        Commands::Settings { action } => commands::settings::handle(action, &client, format).await,
        Commands::Context { action } => commands::context::handle(action, &client, format).await,
        Commands::Notes { action } => commands::notes::handle(action, &client).await,
        Commands::Audit { action } => commands::audit::handle(action, &client, format).await,
        Commands::Config { action } => commands::config::handle(action, profile).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
