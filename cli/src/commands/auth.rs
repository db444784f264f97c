//! Session commands

use super::ApiClient;
use crate::config::Config;
use colored::Colorize;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    expires_at: String,
    role: String,
}

pub async fn login(client: &ApiClient, profile: Option<&str>, email: &str, password: &str) -> Result<(), String> {
    let body = json!({ "email": email, "password": password });
    let session: LoginResponse = client.post("/api/auth/login", &body).await?;

    let mut config = Config::load(profile).unwrap_or_default();
    config.token = Some(session.token);
    if config.api_url.is_none() {
        config.api_url = Some(client.base_url.clone());
    }
    config.save(profile)?;

    println!(
        "{} Signed in as {} ({}), session expires {}",
        "✓".green(),
        email,
        session.role,
        session.expires_at
    );
    Ok(())
}

pub async fn logout(client: &ApiClient, profile: Option<&str>) -> Result<(), String> {
    let result: Result<(), String> = client.post("/api/auth/logout", &json!({})).await;

    let mut config = Config::load(profile).unwrap_or_default();
    config.token = None;
    config.save(profile)?;

    match result {
        Ok(()) => println!("{} Signed out", "✓".green()),
        Err(e) => println!("{} Local session cleared; server said: {}", "!".yellow(), e),
    }
    Ok(())
}
