use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::log_warn;
use crate::segmentation::SegmentationConfig;

const IDLE_THRESHOLD_ENV: &str = "LOCKIN_IDLE_THRESHOLD_SECS";
const LOCK_TIMEOUT_ENV: &str = "LOCKIN_LOCK_TIMEOUT_MS";
const CLOCK_SKEW_ENV: &str = "LOCKIN_MAX_CLOCK_SKEW_SECS";

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Gap between pings after which time is counted as idle.
    pub idle_threshold_secs: u64,
    /// Tolerated lead of client timestamps over server time.
    pub max_clock_skew_secs: u64,
    /// How long an upload waits for another request on the same session.
    pub lock_timeout_ms: u64,
    pub default_feed_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            idle_threshold_secs: SegmentationConfig::default().idle_threshold_secs,
            max_clock_skew_secs: SegmentationConfig::default().max_clock_skew_secs,
            lock_timeout_ms: 2_000,
            default_feed_limit: 50,
        }
    }
}

impl EngineSettings {
    /// Apply `LOCKIN_*` environment overrides; unparsable values and a zero idle threshold are
    /// ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(IDLE_THRESHOLD_ENV).and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(0) => log_warn!("Ignoring {IDLE_THRESHOLD_ENV}=0; the threshold must be positive"),
            Some(value) => self.idle_threshold_secs = value,
            None => {}
        }
        if let Some(value) = lookup(LOCK_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            self.lock_timeout_ms = value;
        }
        if let Some(value) = lookup(CLOCK_SKEW_ENV).and_then(|v| v.trim().parse().ok()) {
            self.max_clock_skew_secs = value;
        }
        self
    }

    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig {
            idle_threshold_secs: self.idle_threshold_secs,
            max_clock_skew_secs: self.max_clock_skew_secs,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// JSON-file backed settings; a missing or unreadable file yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.engine(), EngineSettings::default());
        assert_eq!(store.engine().segmentation().idle_threshold_secs, 300);
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let settings = EngineSettings {
            idle_threshold_secs: 120,
            ..EngineSettings::default()
        };
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.engine(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.engine().idle_threshold_secs, 120);
    }

    #[test]
    fn test_partial_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{ "lockTimeoutMs": 50 }"#).unwrap();
        let store = SettingsStore::new(partial).unwrap();
        assert_eq!(store.engine().lock_timeout_ms, 50);
        assert_eq!(store.engine().idle_threshold_secs, 300);

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "not json").unwrap();
        let store = SettingsStore::new(corrupt).unwrap();
        assert_eq!(store.engine(), EngineSettings::default());
        assert!(store.reload().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let settings = EngineSettings::default().with_overrides_from(|key| match key {
            IDLE_THRESHOLD_ENV => Some(" 90 ".into()),
            LOCK_TIMEOUT_ENV => Some("soon".into()),
            _ => None,
        });
        assert_eq!(settings.idle_threshold_secs, 90);
        assert_eq!(settings.lock_timeout_ms, 2_000);
        assert_eq!(settings.lock_timeout(), Duration::from_millis(2_000));
    }

    #[test]
    fn test_zero_idle_threshold_override_is_ignored() {
        let settings = EngineSettings::default().with_overrides_from(|key| match key {
            IDLE_THRESHOLD_ENV => Some("0".into()),
            CLOCK_SKEW_ENV => Some("5".into()),
            _ => None,
        });
        assert_eq!(settings.idle_threshold_secs, 300);
        assert_eq!(settings.max_clock_skew_secs, 5);

        let config = settings.segmentation();
        assert_eq!(config.idle_threshold(), chrono::Duration::seconds(300));
        assert_eq!(config.max_clock_skew(), chrono::Duration::seconds(5));
    }
}
