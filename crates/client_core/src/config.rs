use std::{collections::HashMap, fs, io, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use url::Url;

use crate::{naming::PublicDomains, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: Option<String>,
    pub push_url: Option<String>,
    pub request_timeout: Duration,
    pub max_attempts: usize,
    pub retry_delay: Duration,
    pub public_domains: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            api_base_url: None,
            push_url: None,
            request_timeout: Duration::from_secs(10),
            max_attempts: retry.max_attempts,
            retry_delay: retry.delay,
            public_domains: None,
        }
    }
}

impl Settings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            delay: self.retry_delay,
        }
    }

    pub fn public_domains(&self) -> PublicDomains {
        match &self.public_domains {
            Some(domains) => domains.iter().collect(),
            None => PublicDomains::default(),
        }
    }

    /// Explicit push url, else one derived from the api base url.
    pub fn resolved_push_url(&self) -> Result<Option<String>> {
        match (&self.push_url, &self.api_base_url) {
            (Some(push_url), _) => Ok(Some(push_url.clone())),
            (None, Some(base_url)) => push_url_from_base(base_url).map(Some),
            (None, None) => Ok(None),
        }
    }

    fn apply(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "api_base_url" => self.api_base_url = Some(normalize_base_url(value)?),
            "push_url" => self.push_url = Some(value.trim().to_string()),
            "request_timeout_secs" => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid request_timeout_secs '{value}'"))?;
                self.request_timeout = Duration::from_secs(secs);
            }
            "max_attempts" => {
                self.max_attempts = value
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid max_attempts '{value}'"))?;
            }
            "retry_delay_ms" => {
                let millis = value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid retry_delay_ms '{value}'"))?;
                self.retry_delay = Duration::from_millis(millis);
            }
            "public_domains" => {
                self.public_domains = Some(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|domain| !domain.is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            _ => {}
        }
        Ok(())
    }
}

const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("API_BASE_URL", "api_base_url"),
    ("APP__API_BASE_URL", "api_base_url"),
    ("APP__PUSH_URL", "push_url"),
    ("APP__REQUEST_TIMEOUT_SECS", "request_timeout_secs"),
    ("APP__MAX_ATTEMPTS", "max_attempts"),
    ("APP__RETRY_DELAY_MS", "retry_delay_ms"),
    ("APP__PUBLIC_DOMAINS", "public_domains"),
];

/// Defaults, then the flat `key = "value"` table in `path` (if present), then
/// environment variables.
pub fn load_settings(path: &Path) -> Result<Settings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

pub fn load_settings_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            for (name, value) in &file_cfg {
                settings
                    .apply(name, value)
                    .with_context(|| format!("invalid value in '{}'", path.display()))?;
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    for &(var, name) in ENV_OVERRIDES {
        if let Some(value) = env(var) {
            settings
                .apply(name, &value)
                .with_context(|| format!("invalid value in {var}"))?;
        }
    }

    Ok(settings)
}

/// Trims surrounding whitespace and trailing slashes; only http(s) is accepted.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base url must start with http:// or https://, got '{raw}'");
    }
    Ok(trimmed.to_string())
}

pub fn push_url_from_base(base_url: &str) -> Result<String> {
    let base_url = normalize_base_url(base_url)?;
    let ws_url = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        bail!("base url must start with http:// or https://");
    };
    Ok(format!("{ws_url}/push"))
}
