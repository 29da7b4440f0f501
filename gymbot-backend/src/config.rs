use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    pub const AI_API_KEY: &str = "AI_API_KEY";
    /// Chat-completions endpoint. Any OpenAI-compatible server works.
    pub const AI_ENDPOINT: &str = "AI_ENDPOINT";
    pub const AI_MODEL: &str = "AI_MODEL";
    /// Per-request timeout for model calls. On timeout the whole
    /// command fails; nothing is partially written.
    pub const AI_TIMEOUT_SECS: &str = "AI_TIMEOUT_SECS";
    pub const DATABASE_URL: &str = "DATABASE_URL";
}

/// Default values
pub mod defaults {
    pub const AI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
    pub const AI_MODEL: &str = "gpt-4o-mini";
    pub const AI_TIMEOUT_SECS: u64 = 60;
    pub const DATABASE_URL: &str = "./.db/gymbot.db";
}

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub ai_api_key: String,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            telegram_bot_token: env::var(env_vars::TELEGRAM_BOT_TOKEN)
                .expect("TELEGRAM_BOT_TOKEN must be set"),
            ai_api_key: env::var(env_vars::AI_API_KEY).expect("AI_API_KEY must be set"),
            ai_endpoint: env::var(env_vars::AI_ENDPOINT)
                .unwrap_or_else(|_| defaults::AI_ENDPOINT.to_string()),
            ai_model: env::var(env_vars::AI_MODEL)
                .unwrap_or_else(|_| defaults::AI_MODEL.to_string()),
            ai_timeout_secs: env::var(env_vars::AI_TIMEOUT_SECS)
                .unwrap_or_else(|_| defaults::AI_TIMEOUT_SECS.to_string())
                .parse()
                .expect("AI_TIMEOUT_SECS must be a valid number"),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
        }
    }
}
