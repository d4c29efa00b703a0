use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".habitgrid";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_CLEANUP_TIME: &str = "03:30";
pub const DEFAULT_STATS_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub stats_window_days: u32,
    pub default_retention_days: u32,
    pub cleanup_time: String,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("habitgrid.db"),
            api_port: 7391,
            stats_window_days: DEFAULT_STATS_WINDOW_DAYS,
            default_retention_days: DEFAULT_RETENTION_DAYS,
            cleanup_time: DEFAULT_CLEANUP_TIME.to_string(),
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value.trim());
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "stats_window_days" => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("stats_window_days must be a number"))?;
                if !(7..=3650).contains(&parsed) {
                    bail!("stats_window_days must be between 7 and 3650");
                }
                self.stats_window_days = parsed;
            }
            "default_retention_days" => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("default_retention_days must be a number"))?;
                if parsed == 0 {
                    bail!("default_retention_days must be at least 1");
                }
                self.default_retention_days = parsed;
            }
            "cleanup_time" => {
                parse_hhmm(value)?;
                self.cleanup_time = value.to_string();
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_port|api.port, stats_window_days|stats.window_days, default_retention_days|tasks.retention_days, cleanup_time|cleanup.time"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "stats_window_days" => Some(self.stats_window_days.to_string()),
            "default_retention_days" => Some(self.default_retention_days.to_string()),
            "cleanup_time" => Some(self.cleanup_time.clone()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "stats_window_days" | "stats.window_days" => "stats_window_days",
        "default_retention_days" | "tasks.retention_days" => "default_retention_days",
        "cleanup_time" | "cleanup.time" => "cleanup_time",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 03:30 (24-hour format)"))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn dotted_aliases_resolve_to_fields() {
        let mut config = Config::default();
        config.set_value("api.port", "8123").expect("port set");
        config.set_value("cleanup.time", "04:15").expect("time set");

        assert_eq!(config.api_port, 8123);
        assert_eq!(config.get_value("cleanup_time").as_deref(), Some("04:15"));
    }

    #[test]
    fn rejects_out_of_range_window() {
        let mut config = Config::default();
        assert!(config.set_value("stats_window_days", "3").is_err());
        assert!(config.set_value("cleanup_time", "25:00").is_err());
        assert!(config.set_value("unknown", "1").is_err());
        assert_eq!(config.stats_window_days, 365);
    }
}
