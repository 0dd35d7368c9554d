use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::cadence::CadenceController;
use crate::error::ConfigError;
use crate::incident::Snapshot;
use crate::types::Config;

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "TRAFFICBOT_CONFIG";

/// Counters an operator can watch; the feed failing for hours shows up here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub notify_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
}

/// Everything the poll loop carries from one cycle to the next.
///
/// Created once before the loop starts; the previous snapshots are replaced
/// wholesale at the end of each completed cycle.
#[derive(Debug, Clone)]
pub struct PollerState {
    previous_major: Snapshot,
    previous_roadworks: Snapshot,
    cadence: CadenceController,
    stats: PollStats,
}

impl PollerState {
    pub fn new(roadworks_every: u32) -> Self {
        Self {
            previous_major: Snapshot::default(),
            previous_roadworks: Snapshot::default(),
            cadence: CadenceController::new(roadworks_every),
            stats: PollStats::default(),
        }
    }

    pub fn previous_major(&self) -> &Snapshot {
        &self.previous_major
    }

    pub fn previous_roadworks(&self) -> &Snapshot {
        &self.previous_roadworks
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    pub(crate) fn cadence_mut(&mut self) -> &mut CadenceController {
        &mut self.cadence
    }

    /// Returns the new consecutive-failure count.
    pub(crate) fn record_fetch_failure(&mut self) -> u32 {
        self.stats.consecutive_failures += 1;
        self.stats.total_failures += 1;
        self.stats.consecutive_failures
    }

    pub(crate) fn record_fetch_success(&mut self) {
        self.stats.consecutive_failures = 0;
        self.stats.last_success = Some(Utc::now());
    }

    pub(crate) fn record_notify_failure(&mut self) {
        self.stats.notify_failures += 1;
    }

    /// Finish a cycle. Roadworks only advance on cycles that evaluated them.
    pub(crate) fn advance(&mut self, major: Snapshot, roadworks: Option<Snapshot>) {
        self.previous_major = major;
        if let Some(roadworks) = roadworks {
            self.previous_roadworks = roadworks;
        }
        self.stats.cycles += 1;
    }
}

/// Load configuration from `$TRAFFICBOT_CONFIG` or ~/.trafficbot/config.json,
/// then apply credential overrides from the environment.
///
/// A missing file is not an error when the environment carries everything.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = match std::env::var_os(CONFIG_PATH_ENV) {
        Some(p) => PathBuf::from(p),
        None => default_config_path()?,
    };

    let mut config = match load_config_from(&path) {
        Ok(c) => c,
        Err(ConfigError::NotFound(p)) => {
            log::info!("No config file at {}, using defaults", p.display());
            Config::default()
        }
        Err(e) => return Err(e),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".trafficbot").join("config.json"))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Environment wins over the file for credentials.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DATAMALL_API_KEY") {
        config.datamall_api_key = Some(v);
    }
    if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
        config.telegram_bot_token = Some(v);
    }
    if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
        config.chat_id = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Incident;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{"datamallApiKey":"abc","roadworksMessageId":99,"pollIntervalSeconds":60}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.datamall_api_key.as_deref(), Some("abc"));
        assert_eq!(config.roadworks_message_id, 99);
        assert_eq!(config.poll_interval_seconds, 60);
        assert_eq!(config.major_message_id, 238);
    }

    #[test]
    fn test_load_config_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = load_config_from(&temp.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_config_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = Config {
            datamall_api_key: Some("from-file".into()),
            chat_id: Some("file-chat".into()),
            ..Config::default()
        };
        let env: HashMap<&str, &str> =
            HashMap::from([("DATAMALL_API_KEY", "from-env"), ("TELEGRAM_BOT_TOKEN", "tok")]);
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.datamall_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.telegram_bot_token.as_deref(), Some("tok"));
        assert_eq!(config.chat_id.as_deref(), Some("file-chat"));
    }

    #[test]
    fn test_fetch_failure_counting() {
        let mut state = PollerState::new(5);
        assert_eq!(state.record_fetch_failure(), 1);
        assert_eq!(state.record_fetch_failure(), 2);
        state.record_fetch_success();
        assert_eq!(state.stats().consecutive_failures, 0);
        assert_eq!(state.stats().total_failures, 2);
        assert!(state.stats().last_success.is_some());
    }

    #[test]
    fn test_advance_keeps_roadworks_when_not_evaluated() {
        let mut state = PollerState::new(5);
        let roadworks = Snapshot::from(vec![Incident::new("Roadwork", "Roadworks on AYE", 1.0, 1.0)]);
        state.advance(Snapshot::default(), Some(roadworks));
        assert_eq!(state.previous_roadworks().len(), 1);

        let major = Snapshot::from(vec![Incident::new("Accident", "Accident on PIE", 1.0, 1.0)]);
        state.advance(major, None);
        assert_eq!(state.previous_major().len(), 1);
        assert_eq!(state.previous_roadworks().len(), 1);
        assert_eq!(state.stats().cycles, 2);
    }
}
