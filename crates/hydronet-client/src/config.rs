use hydronet_core::{HydroNetError, HydroNetResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "HYDRONET_BASE_URL";
/// Environment variable overriding [`ClientConfig::user_id`].
pub const ENV_USER_ID: &str = "HYDRONET_USER_ID";

/// How a `tool_result` picks among several running invocations of the same
/// tool.
///
/// The backend does not send a call id, so results are matched by tool name
/// alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationPolicy {
    /// Oldest unresolved invocation first. Matches the backend, which runs
    /// tools one after another and reports them in call order.
    #[default]
    Fifo,
    /// Most recently created unresolved invocation first.
    Lifo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-User-ID` on every request.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Upper bound for one chat turn in seconds; `0` disables it.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    #[serde(default)]
    pub correlation: CorrelationPolicy,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_turn_timeout_secs() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: default_user_id(),
            turn_timeout_secs: default_turn_timeout_secs(),
            correlation: CorrelationPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> HydroNetResult<Self> {
        toml::from_str(raw).map_err(|e| HydroNetError::Config(e.to_string()))
    }

    /// Reads a TOML config file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> HydroNetResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                info!(path = %path.display(), "Loaded client config");
                Self::from_toml_str(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(HydroNetError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))),
        }
    }

    /// Applies `HYDRONET_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(user) = lookup(ENV_USER_ID) {
            self.user_id = user;
        }
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn validate(&self) -> HydroNetResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HydroNetError::Config("base_url must not be empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(HydroNetError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(HydroNetError::Config("user_id must not be empty".into()));
        }
        Ok(())
    }

    /// Absolute URL for an API path such as `/api/chat/stream`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        (self.turn_timeout_secs > 0).then(|| Duration::from_secs(self.turn_timeout_secs))
    }
}
