//! Environment-driven configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{Context, Result};
use chrono::FixedOffset;

use super::time::parse_utc_offset;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_DATABASE_PATH: &str = "reminders.db";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_UTC_OFFSET: &str = "+05:00";
const DEFAULT_FOLLOW_UP_MINUTES: &str = "7,25,60";
const DEFAULT_LLM_MAX_TOKENS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub database_path: String,
    pub log_level: String,
    /// Offset used to show reminder times to users and to anchor the LLM prompt
    pub user_utc_offset: FixedOffset,
    /// Escalation delays after a delivered reminder, relative to delivery
    pub follow_up_minutes: Vec<u64>,
    pub llm_max_tokens: u64,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} must be set", key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let user_utc_offset = parse_utc_offset(&optional("USER_UTC_OFFSET", DEFAULT_UTC_OFFSET))
            .context("USER_UTC_OFFSET is invalid")?;

        let follow_up_minutes =
            parse_follow_up_minutes(&optional("FOLLOW_UP_MINUTES", DEFAULT_FOLLOW_UP_MINUTES))
                .context("FOLLOW_UP_MINUTES is invalid")?;

        let llm_max_tokens = match lookup("LLM_MAX_TOKENS").filter(|v| !v.trim().is_empty()) {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow::anyhow!("LLM_MAX_TOKENS must be a positive integer"))?,
            None => DEFAULT_LLM_MAX_TOKENS,
        };

        Ok(Config {
            discord_token: required("DISCORD_TOKEN")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: optional("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            database_path: optional("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            log_level: optional("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            user_utc_offset,
            follow_up_minutes,
            llm_max_tokens,
        })
    }
}

/// Parse a comma-separated, strictly increasing list of minutes such as `7,25,60`
fn parse_follow_up_minutes(value: &str) -> Result<Vec<u64>> {
    let minutes = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("not a number of minutes: {:?}", part.trim()))
        })
        .collect::<Result<Vec<_>>>()?;

    if minutes.is_empty() {
        return Err(anyhow::anyhow!("at least one follow-up delay is required"));
    }
    if minutes.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(anyhow::anyhow!("follow-up delays must be strictly increasing"));
    }

    Ok(minutes)
}
