use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use miro_client::RetryPolicy;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Export configuration loaded from environment variables.
///
/// CLI flags override individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: Option<String>,
    pub org_id: Option<String>,
    pub api_base: String,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub total_licenses: u32,
    pub inactive_days: i64,
    pub slack_webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let retry = RetryPolicy {
            max_rate_limit_retries: parse_or(&lookup, "MIRO_RATE_LIMIT_RETRIES", defaults.max_rate_limit_retries)?,
            max_transport_retries: parse_or(&lookup, "MIRO_TRANSPORT_RETRIES", defaults.max_transport_retries)?,
            base_delay: Duration::from_millis(parse_or(
                &lookup,
                "MIRO_RETRY_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_or(
                &lookup,
                "MIRO_RETRY_MAX_MS",
                defaults.max_delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            api_token: non_empty("MIRO_API_TOKEN").map(|t| t.trim().to_string()),
            org_id: non_empty("MIRO_ORG_ID").map(|o| o.trim().to_string()),
            api_base: non_empty("MIRO_API_BASE")
                .unwrap_or_else(|| miro_client::DEFAULT_BASE_URL.to_string()),
            retry,
            request_timeout: Duration::from_secs(parse_or(&lookup, "MIRO_TIMEOUT_SECS", 30)?),
            total_licenses: parse_or(&lookup, "MIRO_TOTAL_LICENSES", 600)?,
            inactive_days: parse_or(&lookup, "MIRO_INACTIVE_DAYS", 90)?,
            slack_webhook_url: non_empty("SLACK_WEBHOOK_URL"),
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .context("Miro API token is required (--token, --token-file or MIRO_API_TOKEN)")
    }

    pub fn require_org_id(&self) -> Result<&str> {
        self.org_id
            .as_deref()
            .context("Miro organization ID is required (--org-id or MIRO_ORG_ID)")
    }
}

/// Read a token from a text file, trimming surrounding whitespace.
pub fn read_token_file(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read token file {}", path.display()))?;
    let token = contents.trim();
    if token.is_empty() {
        bail!("Token file {} is empty", path.display());
    }
    Ok(token.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number (got {:?})", key, raw)),
        _ => Ok(default),
    }
}
