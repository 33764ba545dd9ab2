//! Configuration management for the posture client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default lifetime of a cached GET response
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Default persisted-store key for the selected organization
pub const DEFAULT_SELECTED_ORG_KEY: &str = "selectedOrgId";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL prepended to every endpoint path (e.g. `https://dash.example.com`)
    #[serde(default)]
    pub base_url: String,

    /// GET cache lifetime in milliseconds
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Login entry point used after a session error
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Endpoint listing the signed-in user's organization memberships
    #[serde(default = "default_memberships_endpoint")]
    pub memberships_endpoint: String,

    /// Persisted-store key holding the selected organization id
    #[serde(default = "default_selected_org_key")]
    pub selected_org_key: String,
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_memberships_endpoint() -> String {
    "/api/v1/orgs/memberships".to_string()
}

fn default_selected_org_key() -> String {
    DEFAULT_SELECTED_ORG_KEY.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            cache_ttl_ms: default_cache_ttl_ms(),
            login_path: default_login_path(),
            memberships_endpoint: default_memberships_endpoint(),
            selected_org_key: default_selected_org_key(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::Invalid(
            "Could not determine config directory".to_string(),
        ))?;

        Ok(base.join("posture").join("client.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Validate field values
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty()
            && !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            ))
            .into());
        }
        if !self.memberships_endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(
                "memberships_endpoint must start with '/'".to_string(),
            )
            .into());
        }
        if self.selected_org_key.is_empty() {
            return Err(ConfigError::Invalid("selected_org_key must not be empty".to_string()).into());
        }
        Ok(())
    }

    /// GET cache lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Redirect target used when the session has expired
    pub fn expired_login_url(&self) -> String {
        let sep = if self.login_path.contains('?') { '&' } else { '?' };
        format!("{}{}expired=true", self.login_path, sep)
    }
}
