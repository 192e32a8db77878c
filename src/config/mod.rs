//! Environment-driven configuration.
//!
//! Loads `.env` first if present, then reads recognized variables with
//! typed defaults. Values keep working when the env file carries trailing
//! comments or whitespace.

use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    // ── Server
    pub host: String,
    pub port: u16,

    // ── Database
    pub database_url: String,

    // ── Completion backend
    pub completion_api_key: String,
    pub completion_base_url: String,
    pub completion_model: String,
    pub completion_timeout_secs: u64,

    // ── Logging
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Tolerate inline comments and whitespace in .env values.
            let clean = val.split('#').next().unwrap_or("").trim();
            match clean.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {key} = '{val}' (parse failed, using default)");
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Missing .env is fine; plain environment variables still apply.
        let _ = dotenvy::dotenv();

        Self {
            host: env_var_or("EMBER_HOST", "0.0.0.0".to_string()),
            port: env_var_or("EMBER_PORT", 8787),
            database_url: env_var_or("DATABASE_URL", "sqlite:./embercoach.db?mode=rwc".to_string()),
            completion_api_key: env_var_or("COMPLETION_API_KEY", String::new()),
            completion_base_url: env_var_or(
                "COMPLETION_BASE_URL",
                "https://api.openai.com/v1".to_string(),
            ),
            completion_model: env_var_or("COMPLETION_MODEL", "gpt-4o-mini".to_string()),
            completion_timeout_secs: env_var_or("COMPLETION_TIMEOUT_SECS", 20),
            log_level: env_var_or("EMBER_LOG_LEVEL", "info".to_string()),
        }
    }
}
