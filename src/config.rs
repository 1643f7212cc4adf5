//! Configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::priority::{DEFAULT_EXAM_HOUR, DEFAULT_WINDOW_DAYS};

const APP_DIR: &str = "studytrack";
const LOCAL_CONFIG: &str = "studytrack.toml";
const GLOBAL_CONFIG: &str = "config.toml";
const DEFAULT_DB_NAME: &str = "studytrack.db";

pub const ENV_DB: &str = "STUDYTRACK_DB";
pub const ENV_WINDOW_DAYS: &str = "STUDYTRACK_WINDOW_DAYS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file. Falls back to the platform config directory.
    pub database_path: Option<PathBuf>,
    /// Days ahead a test may be and still appear in the priority feed.
    pub window_days: i64,
    /// Seconds between countdown refreshes in the dashboard.
    pub refresh_secs: u64,
    /// Local hour tests are scheduled at.
    pub exam_hour: u32,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            window_days: DEFAULT_WINDOW_DAYS,
            refresh_secs: 60,
            exam_hour: DEFAULT_EXAM_HOUR,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => path.clone(),
            None => default_database_path(),
        }
    }

    fn validate(&self, source: &Path) -> Result<()> {
        let fail = |message: &str| {
            Err(Error::Config {
                path: source.to_path_buf(),
                message: message.to_string(),
            })
        };

        if self.window_days < 0 {
            return fail("window_days must not be negative");
        }
        if self.exam_hour > 23 {
            return fail("exam_hour must be between 0 and 23");
        }
        if self.refresh_secs == 0 {
            return fail("refresh_secs must be at least 1");
        }
        Ok(())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB) {
            self.database_path = Some(PathBuf::from(db));
        }

        if let Some(raw) = lookup(ENV_WINDOW_DAYS) {
            self.window_days = raw.trim().parse().map_err(|_| Error::Config {
                path: PathBuf::from(format!("${}", ENV_WINDOW_DAYS)),
                message: format!("expected a whole number of days, got '{}'", raw),
            })?;
        }

        Ok(())
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

fn default_database_path() -> PathBuf {
    let dir = config_dir().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).ok();
    dir.join(DEFAULT_DB_NAME)
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `path`, which must exist when given
/// 2. `studytrack.toml` in the current directory
/// 3. `<config_dir>/studytrack/config.toml`
///
/// Environment overrides: `STUDYTRACK_DB`, `STUDYTRACK_WINDOW_DAYS`.
pub fn load_config_from(path: Option<&Path>) -> Result<Config> {
    load_with(path, |key| std::env::var(key).ok())
}

fn find_config(path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = path {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        return Err(Error::Config {
            path: p.to_path_buf(),
            message: "file not found".to_string(),
        });
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(config_dir()
        .map(|d| d.join(GLOBAL_CONFIG))
        .filter(|p| p.exists()))
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: format!("failed to read: {}", e),
    })?;
    toml::from_str(&content).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let source = find_config(path)?;
    let mut config = match &source {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            read_config(p)?
        }
        None => Config::default(),
    };

    config.apply_overrides(lookup)?;

    let label = source.unwrap_or_else(|| PathBuf::from("<defaults>"));
    config.validate(&label)?;
    Ok(config)
}
