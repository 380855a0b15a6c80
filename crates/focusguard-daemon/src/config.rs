use anyhow::{bail, Context, Result};
use focusguard_common::Difficulty;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub sampler: SamplerConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub challenge: ChallengeConfig,

    #[serde(default)]
    pub enforcement: EnforcementConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir =
            dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join("focusguard");

        Self { path: data_dir.join("focusguard.db").to_string_lossy().to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplerConfig {
    #[serde(default = "default_sampler_interval")]
    pub interval_secs: u64,
}

fn default_sampler_interval() -> u64 {
    30
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval_secs: default_sampler_interval() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Application id of the FocusGuard UI client itself
    #[serde(default = "default_own_package")]
    pub own_package: String,

    /// Shell and system UI surfaces that never count as an app switch
    #[serde(default = "default_ignored_packages")]
    pub ignored_packages: Vec<String>,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_own_package() -> String {
    "focusguard".to_string()
}

fn default_ignored_packages() -> Vec<String> {
    ["org.gnome.Shell", "plasmashell", "waybar", "rofi", "wofi", "fuzzel"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            own_package: default_own_package(),
            ignored_packages: default_ignored_packages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChallengeConfig {
    /// Used until a difficulty is chosen through the control interface
    #[serde(default)]
    pub default_difficulty: Difficulty,

    /// Treat the problem time limit as a deadline that resolves like "skip"
    #[serde(default)]
    pub enforce_time_limit: bool,

    #[serde(default = "default_fallback_reward")]
    pub fallback_reward_minutes: u32,
}

fn default_fallback_reward() -> u32 {
    5
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            default_difficulty: Difficulty::default(),
            enforce_time_limit: false,
            fallback_reward_minutes: default_fallback_reward(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EnforcementConfig {
    /// Log navigation actions instead of running compositor commands
    #[serde(default)]
    pub dry_run: bool,
}

impl DaemonConfig {
    /// Default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("focusguard")
            .join("daemon.toml")
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        debug!("Loading daemon configuration from {:?}", config_path);

        if !config_path.exists() {
            info!(
                "Configuration file not found at {:?}, creating default configuration",
                config_path
            );
            let default_config = Self::default();
            default_config.save_to_path(config_path)?;
            return Ok(default_config);
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: DaemonConfig = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        config.validate()?;

        info!("Loaded daemon configuration from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        debug!("Saving daemon configuration to {:?}", config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let config_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Saved daemon configuration to {:?}", config_path);
        Ok(())
    }

    /// Database path, honouring the `DATABASE_URL` override
    pub fn database_path(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.path.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampler.interval_secs == 0 {
            bail!("sampler.interval_secs must be greater than zero");
        }

        if self.watcher.poll_interval_ms == 0 {
            bail!("watcher.poll_interval_ms must be greater than zero");
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.sampler.interval_secs, 30);
        assert_eq!(config.watcher.own_package, "focusguard");
        assert_eq!(config.challenge.default_difficulty, Difficulty::Medium);
        assert!(!config.challenge.enforce_time_limit);
        assert_eq!(config.challenge.fallback_reward_minutes, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("daemon.toml");

        let config = DaemonConfig::load_from_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.sampler.interval_secs, 30);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        fs::write(
            &path,
            r#"
[challenge]
default_difficulty = "HARD"
enforce_time_limit = true

[sampler]
interval_secs = 10
"#,
        )
        .unwrap();

        let config = DaemonConfig::load_from_path(&path).unwrap();
        assert_eq!(config.challenge.default_difficulty, Difficulty::Hard);
        assert!(config.challenge.enforce_time_limit);
        assert_eq!(config.challenge.fallback_reward_minutes, 5);
        assert_eq!(config.sampler.interval_secs, 10);
        assert_eq!(config.watcher.poll_interval_ms, 1000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        fs::write(&path, "[sampler]\ninterval_secs = 0\n").unwrap();

        assert!(DaemonConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");

        let mut config = DaemonConfig::default();
        config.watcher.ignored_packages = vec!["waybar".to_string()];
        config.save_to_path(&path).unwrap();

        let loaded = DaemonConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.watcher.ignored_packages, vec!["waybar".to_string()]);
    }
}
