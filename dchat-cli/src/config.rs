//! CLI configuration: database path, acting user, log file.
//!
//! Loaded from the environment: DATABASE_URL, DCHAT_USER, LOG_FILE.

use anyhow::Result;
use std::env;

pub struct CliConfig {
    pub database_url: String,
    pub user_id: String,
    pub log_file: Option<String>,
}

impl CliConfig {
    /// Loads from environment variables: DCHAT_USER is required (unless the
    /// --user flag overrides it), DATABASE_URL and LOG_FILE are optional.
    pub fn from_env(user_override: Option<String>) -> Result<Self> {
        let user_id = match user_override {
            Some(user) => user,
            None => env::var("DCHAT_USER")
                .map_err(|_| anyhow::anyhow!("DCHAT_USER not set (or pass --user)"))?,
        };
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "dchat.db".to_string());
        let log_file = env::var("LOG_FILE").ok();
        Ok(Self {
            database_url,
            user_id,
            log_file,
        })
    }

}
