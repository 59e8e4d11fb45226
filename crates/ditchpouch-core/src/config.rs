//! DitchPouch configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DitchPouchError, Result};
use crate::types::{DEFAULT_MIN_LIMIT, DEFAULT_TARGET_MG, UnlockPolicy, UserProgress};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DitchPouchConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl DitchPouchConfig {
    /// Load config from `$DITCHPOUCH_CONFIG` or the default path, falling
    /// back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var("DITCHPOUCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            Ok(config)
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DitchPouchError::Config(format!("Failed to read config: {e}")))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DitchPouchError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DitchPouchError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the DitchPouch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ditchpouch")
    }

    /// Secrets from the environment win over the file.
    fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = token;
        }
        if let Some(token) = lookup("WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.webhook_verify_token = token;
        }
        if let Some(secret) = lookup("WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = secret;
        }
        if let Some(token) = lookup("DITCHPOUCH_ADMIN_TOKEN") {
            self.gateway.admin_token = token;
        }
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Required in `X-Admin-Token` for admin routes. Empty disables the check.
    #[serde(default)]
    pub admin_token: String,
}

fn default_port() -> u16 { 5000 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            admin_token: String::new(),
        }
    }
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Facebook Graph API access token
    #[serde(default)]
    pub access_token: String,
    /// WhatsApp Phone Number ID
    #[serde(default)]
    pub phone_number_id: String,
    /// The one tracked user's phone number (international format, no `+`)
    #[serde(default)]
    pub recipient: String,
    /// Token Meta echoes back during the webhook handshake
    #[serde(default)]
    pub webhook_verify_token: String,
    /// App secret for `X-Hub-Signature-256`. Empty skips signature checks.
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_api_version() -> String { "v21.0".into() }

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            recipient: String::new(),
            webhook_verify_token: String::new(),
            app_secret: String::new(),
            api_version: default_api_version(),
        }
    }
}

impl WhatsAppConfig {
    /// Enough to send messages.
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty() && !self.phone_number_id.is_empty() && !self.recipient.is_empty()
    }
}

/// Tapering policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Permitted strength tiers, strongest first.
    #[serde(default = "default_ladder")]
    pub ladder: Vec<u32>,
    #[serde(default = "default_min_limit")]
    pub min_limit: u32,
    #[serde(default = "default_target_mg")]
    pub target_mg: u32,
    /// Zero-dose days at target needed to graduate.
    #[serde(default = "default_graduation_streak")]
    pub graduation_streak: u32,
    #[serde(default)]
    pub unlock_policy: UnlockPolicy,
}

fn default_ladder() -> Vec<u32> { vec![50, 40, 30, 25, 20, 15, 10, 5, 3] }
fn default_min_limit() -> u32 { DEFAULT_MIN_LIMIT }
fn default_target_mg() -> u32 { DEFAULT_TARGET_MG }
fn default_graduation_streak() -> u32 { 3 }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ladder: default_ladder(),
            min_limit: default_min_limit(),
            target_mg: default_target_mg(),
            graduation_streak: default_graduation_streak(),
            unlock_policy: UnlockPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// A fresh profile under this policy.
    pub fn initial_progress(&self) -> UserProgress {
        UserProgress::new(self.min_limit, self.target_mg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ladder.is_empty() {
            return Err(DitchPouchError::Config("tracker.ladder is empty".into()));
        }
        if self.ladder.windows(2).any(|w| w[0] <= w[1]) {
            return Err(DitchPouchError::Config(
                "tracker.ladder must be strictly descending".into(),
            ));
        }
        if self.ladder.contains(&0) {
            return Err(DitchPouchError::Config("tracker.ladder entries must be positive".into()));
        }
        if !self.ladder.contains(&self.target_mg) {
            return Err(DitchPouchError::Config(format!(
                "tracker.target_mg {} is not on the ladder",
                self.target_mg
            )));
        }
        if self.min_limit == 0 {
            return Err(DitchPouchError::Config("tracker.min_limit must be positive".into()));
        }
        if self.graduation_streak == 0 {
            return Err(DitchPouchError::Config(
                "tracker.graduation_streak must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Daily boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Five-field cron with a fixed minute and hour, local time.
    #[serde(default = "default_boundary")]
    pub boundary: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn bool_true() -> bool { true }
fn default_boundary() -> String { "0 0 * * *".into() }
fn default_check_interval() -> u64 { 30 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            boundary: default_boundary(),
            check_interval_secs: default_check_interval(),
        }
    }
}

/// Progress persistence backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `json`, `sqlite` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory for `json`, database file for `sqlite`.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_backend() -> String { "json".into() }
fn default_store_path() -> String { "~/.ditchpouch/data".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// `path` with `~` expanded.
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = DitchPouchConfig::from_toml("").unwrap();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.tracker.ladder, vec![50, 40, 30, 25, 20, 15, 10, 5, 3]);
        assert_eq!(config.tracker.unlock_policy, UnlockPolicy::AllBelow);
        assert_eq!(config.scheduler.boundary, "0 0 * * *");
        assert_eq!(config.store.backend, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = DitchPouchConfig::from_toml(
            r#"
            [whatsapp]
            access_token = "tok"
            phone_number_id = "123"
            recipient = "447700900000"

            [tracker]
            graduation_streak = 5
            unlock_policy = { kind = "next_tier" }
            "#,
        )
        .unwrap();
        assert!(config.whatsapp.is_configured());
        assert_eq!(config.whatsapp.api_version, "v21.0");
        assert_eq!(config.tracker.graduation_streak, 5);
        assert_eq!(config.tracker.min_limit, 3);
        assert_eq!(config.tracker.unlock_policy, UnlockPolicy::NextTier);
    }

    #[test]
    fn test_validate_rejects_bad_ladder() {
        let mut tracker = TrackerConfig::default();
        tracker.ladder = vec![3, 5, 10];
        assert!(tracker.validate().is_err());

        let mut tracker = TrackerConfig::default();
        tracker.target_mg = 4;
        assert!(tracker.validate().is_err());

        let mut tracker = TrackerConfig::default();
        tracker.min_limit = 0;
        assert!(tracker.validate().is_err());
    }

    #[test]
    fn test_env_secrets_override_file() {
        let mut config = DitchPouchConfig::from_toml(
            r#"
            [whatsapp]
            access_token = "from-file"
            webhook_verify_token = "file-verify"
            app_secret = "file-secret"

            [gateway]
            admin_token = "file-admin"
            "#,
        )
        .unwrap();

        let env: std::collections::HashMap<&str, &str> = [
            ("WHATSAPP_ACCESS_TOKEN", "env-access"),
            ("WHATSAPP_APP_SECRET", "env-secret"),
            ("DITCHPOUCH_ADMIN_TOKEN", "env-admin"),
        ]
        .into_iter()
        .collect();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.whatsapp.access_token, "env-access");
        assert_eq!(config.whatsapp.app_secret, "env-secret");
        assert_eq!(config.gateway.admin_token, "env-admin");
        // Unset variables leave the file value alone
        assert_eq!(config.whatsapp.webhook_verify_token, "file-verify");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("ditchpouch-test-config");
        let path = dir.join("config.toml");
        let mut config = DitchPouchConfig::default();
        config.gateway.port = 8088;
        config.tracker.unlock_policy = UnlockPolicy::Candidates(vec![10, 5, 3]);
        config.save_to(&path).unwrap();

        let loaded = DitchPouchConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.gateway.port, 8088);
        assert_eq!(loaded.tracker.unlock_policy, UnlockPolicy::Candidates(vec![10, 5, 3]));
        std::fs::remove_dir_all(&dir).ok();
    }
}
