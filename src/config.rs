//! Configuration types for the visitor register.

use crate::error::{Result, VisitorError};
use crate::scheduler::tasks::DailyTrigger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Visitor log persistence settings.
    pub store: StoreConfig,
    /// Notification transport settings.
    pub email: EmailConfig,
    /// Daily overdue-visitor summary settings.
    pub summary: SummaryConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
        }
    }
}

/// Visitor log persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON state file.
    pub path: PathBuf,
    /// Upper bound on a single state write, in seconds.
    pub io_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("visitors.json"),
            io_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// Which transport carries notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTransport {
    /// POST to an HTTP mail relay.
    #[default]
    Relay,
    /// Write notifications to the log only.
    Log,
}

impl std::str::FromStr for EmailTransport {
    type Err = VisitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relay" => Ok(Self::Relay),
            "log" => Ok(Self::Log),
            other => Err(VisitorError::Config(format!(
                "unknown email transport '{other}' (expected 'relay' or 'log')"
            ))),
        }
    }
}

/// Notification transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub transport: EmailTransport,
    /// Sender address.
    pub sender: Option<String>,
    /// Address that receives every notification.
    pub recipient: Option<String>,
    /// Relay credential.
    pub password: Option<String>,
    /// Relay endpoint URL.
    pub relay_url: Option<String>,
    /// Upper bound on a single send, in seconds.
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransport::Relay,
            sender: None,
            recipient: None,
            password: None,
            relay_url: None,
            timeout_secs: 15,
        }
    }
}

/// Fully specified relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub url: String,
    pub sender: String,
    pub recipient: String,
    pub password: String,
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns relay settings when every field is present and non-blank.
    pub fn relay_settings(&self) -> Option<RelaySettings> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        }

        Some(RelaySettings {
            url: present(&self.relay_url)?,
            sender: present(&self.sender)?,
            recipient: present(&self.recipient)?,
            password: present(&self.password)?,
        })
    }
}

/// Daily summary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// Local wall-clock trigger, `HH:MM`.
    pub time: DailyTrigger,
    /// Scheduler wake-up interval in seconds.
    pub tick_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: DailyTrigger::new(16, 30),
            tick_secs: 30,
        }
    }
}

impl SummaryConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

impl VisitorConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VisitorError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VisitorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/visitor-presence/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config)
                .join("visitor-presence")
                .join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("visitor-presence")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/visitor-presence/config.toml")
        }
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present. Process environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, an override is
    /// malformed, or the result fails [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORT`, `VISITOR_FILE`, `SENDER_EMAIL`, `RECEIVER_EMAIL`,
    /// `EMAIL_PASSWORD`, `EMAIL_RELAY_URL`, `EMAIL_TRANSPORT` and
    /// `DAILY_SUMMARY_TIME` from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `Config` when an override value cannot be parsed.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| VisitorError::Config(format!("invalid PORT '{port}': {e}")))?;
        }
        if let Some(path) = lookup("VISITOR_FILE") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(sender) = lookup("SENDER_EMAIL") {
            self.email.sender = Some(sender);
        }
        if let Some(recipient) = lookup("RECEIVER_EMAIL") {
            self.email.recipient = Some(recipient);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            self.email.password = Some(password);
        }
        if let Some(url) = lookup("EMAIL_RELAY_URL") {
            self.email.relay_url = Some(url);
        }
        if let Some(transport) = lookup("EMAIL_TRANSPORT") {
            self.email.transport = transport.parse()?;
        }
        if let Some(time) = lookup("DAILY_SUMMARY_TIME") {
            self.summary.time = time.parse()?;
        }
        Ok(())
    }

    /// Reject values that would make the service unusable.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.store.io_timeout_secs == 0 {
            return Err(VisitorError::Config(
                "store.io_timeout_secs must be greater than zero".to_owned(),
            ));
        }
        if self.email.timeout_secs == 0 {
            return Err(VisitorError::Config(
                "email.timeout_secs must be greater than zero".to_owned(),
            ));
        }
        if self.summary.tick_secs == 0 {
            return Err(VisitorError::Config(
                "summary.tick_secs must be greater than zero".to_owned(),
            ));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(VisitorError::Config("store.path must not be empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = VisitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store.path, PathBuf::from("visitors.json"));
        assert_eq!(config.summary.time, DailyTrigger::new(16, 30));
        assert_eq!(config.email.transport, EmailTransport::Relay);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = VisitorConfig::default();
        config.server.port = 8080;
        config.summary.time = DailyTrigger::new(17, 5);
        config.email.sender = Some("desk@example.com".to_owned());
        config.save_to_file(&path).unwrap();

        let loaded = VisitorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.summary.time, DailyTrigger::new(17, 5));
        assert_eq!(loaded.email.sender.as_deref(), Some("desk@example.com"));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[summary]\ntime = \"08:15\"\n").unwrap();

        let loaded = VisitorConfig::from_file(&path).unwrap();
        assert_eq!(loaded.summary.time, DailyTrigger::new(8, 15));
        assert!(loaded.summary.enabled);
        assert_eq!(loaded.server.port, 5000);
    }

    #[test]
    fn invalid_trigger_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[summary]\ntime = \"25:00\"\n").unwrap();

        assert!(matches!(
            VisitorConfig::from_file(&path),
            Err(VisitorError::Config(_))
        ));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = VisitorConfig::from_file(Path::new("/nonexistent/visitor-presence.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn environment_overrides_apply() {
        let mut config = VisitorConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("PORT", "8081"),
                ("VISITOR_FILE", "/var/lib/visitors.json"),
                ("SENDER_EMAIL", "desk@example.com"),
                ("RECEIVER_EMAIL", "security@example.com"),
                ("EMAIL_PASSWORD", "secret"),
                ("EMAIL_RELAY_URL", "https://relay.example.com/send"),
                ("DAILY_SUMMARY_TIME", "18:00"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/visitors.json"));
        assert_eq!(config.summary.time, DailyTrigger::new(18, 0));
        let relay = config.email.relay_settings().expect("complete relay settings");
        assert_eq!(relay.recipient, "security@example.com");
    }

    #[test]
    fn malformed_override_is_config_error() {
        let mut config = VisitorConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, VisitorError::Config(_)));
    }

    #[test]
    fn blank_credentials_are_not_relay_settings() {
        let config = EmailConfig {
            sender: Some("desk@example.com".to_owned()),
            recipient: Some("security@example.com".to_owned()),
            password: Some("   ".to_owned()),
            relay_url: Some("https://relay.example.com/send".to_owned()),
            ..EmailConfig::default()
        };
        assert!(config.relay_settings().is_none());
    }

    #[test]
    fn zero_timeouts_fail_validation() {
        let mut config = VisitorConfig::default();
        config.email.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
