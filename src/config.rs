use std::env;
use std::time::Duration;

use eyre::{Result, eyre};
use url::Url;

use crate::cli::chat::typewriter::DEFAULT_TYPING_DELAY;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8002/chat";
pub const DEFAULT_SCHEDULING_URL: &str = "https://calendly.com/";

pub const ENDPOINT_VAR: &str = "VETTING_GATE_ENDPOINT";
pub const TYPING_MS_VAR: &str = "VETTING_GATE_TYPING_MS";
pub const SCHEDULING_URL_VAR: &str = "VETTING_GATE_SCHEDULING_URL";

/// Settings for the chat client. Read once at startup and never changed
/// while the session runs.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub endpoint: Url,
    pub typing_delay: Duration,
    pub scheduling_url: Url,
}

impl GateConfig {
    /// Load from the process environment (after `.env` has been applied).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let scheduling_url =
            lookup(SCHEDULING_URL_VAR).unwrap_or_else(|| DEFAULT_SCHEDULING_URL.to_string());
        let typing_delay = match lookup(TYPING_MS_VAR) {
            Some(raw) => parse_typing_ms(&raw)?,
            None => DEFAULT_TYPING_DELAY,
        };

        Ok(Self {
            endpoint: parse_url(ENDPOINT_VAR, &endpoint)?,
            typing_delay,
            scheduling_url: parse_url(SCHEDULING_URL_VAR, &scheduling_url)?,
        })
    }

    /// Apply command line flags on top of the environment.
    pub fn with_overrides(
        mut self,
        endpoint: Option<&str>,
        typing_ms: Option<u64>,
        scheduling_url: Option<&str>,
    ) -> Result<Self> {
        if let Some(endpoint) = endpoint {
            self.endpoint = parse_url("--endpoint", endpoint)?;
        }
        if let Some(ms) = typing_ms {
            self.typing_delay = Duration::from_millis(ms);
        }
        if let Some(scheduling_url) = scheduling_url {
            self.scheduling_url = parse_url("--scheduling-url", scheduling_url)?;
        }
        Ok(self)
    }
}

fn parse_url(source: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| eyre!("{} is not a valid URL ({}): {}", source, raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(eyre!("{} must use http or https, got {}", source, other)),
    }
}

fn parse_typing_ms(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| eyre!("{} must be a whole number of milliseconds ({}): {}", TYPING_MS_VAR, raw, e))
}
