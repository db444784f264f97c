//! Config commands

use crate::config::{mask, Config};
use crate::ConfigCommands;

const NOT_SET: &str = "(not set)";

pub async fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<(), String> {
    match action {
        ConfigCommands::Init => {
            let path = Config::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile).unwrap_or_default();
            match key.as_str() {
                "api_url" => config.api_url = Some(value),
                "token" => config.token = Some(value),
                "default_format" => config.default_format = Some(value),
                _ => return Err(format!("Unknown config key: {}", key)),
            }
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile).unwrap_or_default();
            let value = match key.as_str() {
                "api_url" => config.api_url,
                "token" => config.token.as_deref().map(mask),
                "default_format" => config.default_format,
                _ => return Err(format!("Unknown config key: {}", key)),
            };
            println!("{}: {}", key, value.unwrap_or_else(|| NOT_SET.into()));
        }
        ConfigCommands::List => {
            let config = Config::load(profile).unwrap_or_default();
            println!("api_url: {}", config.api_url.unwrap_or_else(|| NOT_SET.into()));
            println!("token: {}", config.token.as_deref().map(mask).unwrap_or_else(|| NOT_SET.into()));
            println!(
                "default_format: {}",
                config.default_format.unwrap_or_else(|| NOT_SET.into())
            );
        }
    }
    Ok(())
}
