use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub scheduler: SchedulerConfig,

    pub search: SearchConfig,

    pub email: EmailConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/jobseek.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron, a macro such as `@hourly`/`@daily`, or `@every 30m`.
    pub schedule: String,

    /// How long `stop` waits for an in-flight cycle before giving up on it.
    pub shutdown_grace_seconds: u64,

    /// Pause between searches within one cycle.
    pub search_delay_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: "@hourly".to_string(),
            shutdown_grace_seconds: 30,
            search_delay_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Program followed by any leading arguments.
    pub command: Vec<String>,

    pub sites: Vec<String>,

    pub default_country: String,

    pub default_hours_old: u32,

    pub default_results_wanted: u32,

    /// Upper bound for a single external search, in seconds.
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            command: vec![defaults::SEARCH_PROGRAM.to_string()],
            sites: vec!["linkedin".to_string(), "indeed".to_string()],
            default_country: defaults::COUNTRY.to_string(),
            default_hours_old: defaults::HOURS_OLD,
            default_results_wanted: defaults::RESULTS_WANTED,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Resend API key. When empty, alerts are only written to the log.
    pub api_key: String,

    pub api_url: String,

    /// Sender; defaults to "<app_name> Expat <jobs@expatter.gyokhan.com>".
    pub from: String,

    pub app_name: String,

    /// Public base URL used for redirect and unsubscribe links.
    pub app_domain: String,

    pub max_listed_postings: usize,

    pub request_timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.resend.com".to_string(),
            from: String::new(),
            app_name: "JobSeek".to_string(),
            app_domain: "http://localhost:8080".to_string(),
            max_listed_postings: 25,
            request_timeout_seconds: 30,
        }
    }
}

impl EmailConfig {
    #[must_use]
    pub fn sender(&self) -> String {
        if self.from.trim().is_empty() {
            format!("{} Expat <jobs@expatter.gyokhan.com>", self.app_name)
        } else {
            self.from.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_port: 9000,
        }
    }
}

impl Config {
    /// Loads the first config file found (or defaults), then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Overrides settings from environment-style variables. `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("DB_PATH") {
            self.general.database_path = if path.starts_with("sqlite:") {
                path
            } else {
                format!("sqlite:{path}")
            };
        }
        if let Some(schedule) = get("SCHEDULER_FREQUENCY") {
            self.scheduler.schedule = schedule;
        }
        if let Some(key) = get("RESEND_API_KEY") {
            self.email.api_key = key;
        }
        if let Some(from) = get("EMAIL_FROM") {
            self.email.from = from;
        }
        if let Some(name) = get("APP_NAME") {
            self.email.app_name = name;
        }
        if let Some(domain) = get("APP_DOMAIN") {
            self.email.app_domain = domain;
        }
        if let Some(command) = get("JOBSEEK_COMMAND") {
            self.search.command = command.split_whitespace().map(String::from).collect();
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("jobseek").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".jobseek").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.enabled {
            if self.scheduler.schedule.trim().is_empty() {
                anyhow::bail!("Scheduler schedule cannot be empty when enabled");
            }
            crate::scheduler::Schedule::parse(&self.scheduler.schedule)
                .with_context(|| format!("Invalid schedule '{}'", self.scheduler.schedule))?;
        }

        if self.search.command.first().is_none_or(|p| p.trim().is_empty()) {
            anyhow::bail!("Search command cannot be empty");
        }

        if self.search.timeout_seconds == 0 {
            anyhow::bail!("Search timeout must be > 0");
        }

        url::Url::parse(&self.email.app_domain)
            .with_context(|| format!("Invalid app domain '{}'", self.email.app_domain))?;
        url::Url::parse(&self.email.api_url)
            .with_context(|| format!("Invalid email API URL '{}'", self.email.api_url))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.schedule, "@hourly");
        assert_eq!(config.search.default_country, "Germany");
        assert_eq!(config.search.command, vec!["jobseek-expat".to_string()]);
        assert!(config.email.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[scheduler]"));
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[email]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [scheduler]
            schedule = "@every 30m"

            [search]
            timeout_seconds = 45
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.scheduler.schedule, "@every 30m");
        assert_eq!(config.search.timeout_seconds, 45);

        assert_eq!(config.search.sites, vec!["linkedin", "indeed"]);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DB_PATH", "/var/lib/jobseek/alerts.db"),
            ("SCHEDULER_FREQUENCY", "@daily"),
            ("RESEND_API_KEY", "re_123"),
            ("APP_NAME", ""),
            ("JOBSEEK_COMMAND", "python3 -m jobseek"),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.general.database_path, "sqlite:/var/lib/jobseek/alerts.db");
        assert_eq!(config.scheduler.schedule, "@daily");
        assert_eq!(config.email.api_key, "re_123");
        assert_eq!(config.email.app_name, "JobSeek");
        assert_eq!(config.search.command, vec!["python3", "-m", "jobseek"]);
    }

    #[test]
    fn test_sender_defaults_to_app_name() {
        let mut email = EmailConfig::default();
        assert_eq!(email.sender(), "JobSeek Expat <jobs@expatter.gyokhan.com>");

        email.from = "Alerts <alerts@example.com>".to_string();
        assert_eq!(email.sender(), "Alerts <alerts@example.com>");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.search.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.command.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scheduler.schedule = "@every soon".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scheduler.schedule = "a b c d e".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.email.app_domain = "jobs.example.com".to_string();
        assert!(config.validate().is_err());
    }
}
