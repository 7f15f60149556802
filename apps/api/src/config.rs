use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Missing required variables are fatal at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub anthropic_api_key: String,
    pub gmail_access_token: String,
    pub gmail_api_base: String,
    /// Mailbox the service triages (the address candidates write to).
    pub recruitment_mail: String,
    /// Relay address used by the consulting partner. Mail arriving From this
    /// address carries the real candidate in Reply-To.
    pub consulting_mail: Option<String>,
    pub company_name: String,
    /// Gmail search query used to pick up new applications.
    pub inbox_query: String,
    pub max_results: u32,
    /// 6-field cron expression. Empty/unset disables the scheduled trigger.
    pub cron_schedule: Option<String>,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    /// Backoff applied once when the LLM reports a transient error.
    pub llm_backoff_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            gmail_access_token: require_env("GMAIL_ACCESS_TOKEN")?,
            gmail_api_base: std::env::var("GMAIL_API_BASE")
                .unwrap_or_else(|_| "https://gmail.googleapis.com".to_string()),
            recruitment_mail: require_env("RECRUITMENT_MAIL")?,
            consulting_mail: std::env::var("CONSULTING_MAIL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            company_name: require_env("COMPANY_NAME")?,
            inbox_query: std::env::var("INBOX_QUERY")
                .unwrap_or_else(|_| "in:inbox is:unread".to_string()),
            max_results: parse_env("MAX_RESULTS", 50)?,
            cron_schedule: std::env::var("CRON_SCHEDULE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            retry_attempts: parse_env("RETRY_ATTEMPTS", 3)?,
            retry_delay_secs: parse_env("RETRY_DELAY_SECS", 30)?,
            llm_backoff_secs: parse_env("LLM_BACKOFF_SECS", 60)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        Err(_) => Ok(default),
    }
}
