//! Configuration loading for outbreak.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Explicit config file (`--config`) or `./outbreak.toml`
//! 3. User config (`~/.outbreak/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! Timers and schedule have working defaults. Community identifiers have
//! none: [`Config::validate`] rejects a config without them, and the CLI
//! refuses to start.

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OutbreakError, Result};

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "outbreak.toml";

/// Main configuration struct for outbreak.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Which community, tags and channel the lifecycle runs against.
    pub community: CommunityConfig,
    /// Treatment window schedule.
    pub schedule: ScheduleConfig,
    /// Lifecycle durations.
    pub timers: TimersConfig,
    /// Where records, roster and outbox files live.
    pub storage: StorageConfig,
}

/// Community identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommunityConfig {
    /// Community (guild) identifier.
    pub id: String,
    /// Tag carried by infected members.
    pub infected_tag: String,
    /// Tag applied when a member turns chronic.
    pub chronic_tag: String,
    /// Optional tag applied once an infection has lasted `quarantine_after_minutes`.
    pub quarantine_tag: Option<String>,
    /// Channel where treatment offers are posted.
    pub channel: String,
    /// Quick-action symbol members use to accept an offer.
    pub action_symbol: String,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            infected_tag: String::new(),
            chronic_tag: String::new(),
            quarantine_tag: None,
            channel: String::new(),
            action_symbol: DEFAULT_ACTION_SYMBOL.to_string(),
        }
    }
}

/// Default quick-action symbol for accepting treatment.
pub const DEFAULT_ACTION_SYMBOL: &str = "💊";

/// Treatment window schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Offset from UTC, in minutes, of the civil time all windows use.
    pub utc_offset_minutes: i32,
    /// Hours of the day (0-23) at which a window opens.
    pub window_hours: Vec<u32>,
    /// How long each window stays open.
    pub window_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            // America/Sao_Paulo, which has not observed DST since 2019.
            utc_offset_minutes: -180,
            window_hours: (0..24).step_by(2).collect(),
            window_minutes: 10,
        }
    }
}

/// Largest accepted UTC offset, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Windows must close before the same hour's window opens the next day.
pub const MAX_WINDOW_MINUTES: u32 = 24 * 60 - 1;

impl ScheduleConfig {
    /// The fixed civil offset all timestamps are expressed in.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            OutbreakError::config(format!(
                "schedule.utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    /// Length of a single window.
    pub fn window_length(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }
}

/// Lifecycle durations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimersConfig {
    /// How long an offer can be accepted before it is retracted.
    pub offer_lifetime_minutes: u32,
    /// How long treatment lasts once accepted.
    pub treatment_minutes: u32,
    /// Infection age at which an untreated member turns chronic.
    pub chronic_deadline_hours: u32,
    /// Infection age at which the quarantine tag is applied.
    pub quarantine_after_minutes: u32,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            offer_lifetime_minutes: 10,
            treatment_minutes: 40,
            chronic_deadline_hours: 48,
            quarantine_after_minutes: 40,
        }
    }
}

impl TimersConfig {
    pub fn offer_lifetime(&self) -> Duration {
        Duration::minutes(i64::from(self.offer_lifetime_minutes))
    }

    pub fn treatment_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.treatment_minutes))
    }

    pub fn chronic_deadline(&self) -> Duration {
        Duration::hours(i64::from(self.chronic_deadline_hours))
    }

    pub fn quarantine_after(&self) -> Duration {
        Duration::minutes(i64::from(self.quarantine_after_minutes))
    }
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for per-community files. Defaults to `<outbreak_home>/data`.
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain from the current directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().unwrap_or_default();
        Self::load_from_cwd(&cwd, explicit)
    }

    /// Load configuration with a specific working directory.
    ///
    /// An explicit file that cannot be read is an error. A broken user or
    /// local file is skipped with a warning.
    pub fn load_from_cwd(cwd: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        match explicit {
            Some(path) => {
                config = config.merge(Self::load_from_file(path)?);
            }
            None => {
                let local = cwd.join(LOCAL_CONFIG_FILE);
                if local.exists() {
                    match Self::load_from_file(&local) {
                        Ok(local_config) => config = config.merge(local_config),
                        Err(e) => tracing::warn!(
                            path = %local.display(),
                            error = %e,
                            "ignoring unreadable local config"
                        ),
                    }
                }
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load user config from `~/.outbreak/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = outbreak_home()?.join("config.toml");
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable user config");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| OutbreakError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| OutbreakError::config(e.to_string()))
    }

    /// Apply `OUTBREAK_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_string("OUTBREAK_COMMUNITY_ID") {
            self.community.id = val;
        }
        if let Some(val) = env_string("OUTBREAK_INFECTED_TAG") {
            self.community.infected_tag = val;
        }
        if let Some(val) = env_string("OUTBREAK_CHRONIC_TAG") {
            self.community.chronic_tag = val;
        }
        if let Some(val) = env_string("OUTBREAK_QUARANTINE_TAG") {
            self.community.quarantine_tag = Some(val);
        }
        if let Some(val) = env_string("OUTBREAK_CHANNEL") {
            self.community.channel = val;
        }
        if let Some(val) = env_string("OUTBREAK_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("OUTBREAK_UTC_OFFSET_MINUTES") {
            match val.parse::<i32>() {
                Ok(n) if n.abs() <= MAX_UTC_OFFSET_MINUTES => self.schedule.utc_offset_minutes = n,
                _ => tracing::warn!(
                    "Invalid OUTBREAK_UTC_OFFSET_MINUTES value '{}'. Expected minutes within \
                    +/-{}. Using '{}'.",
                    val,
                    MAX_UTC_OFFSET_MINUTES,
                    self.schedule.utc_offset_minutes
                ),
            }
        }

        override_minutes(
            "OUTBREAK_OFFER_LIFETIME_MINUTES",
            &mut self.timers.offer_lifetime_minutes,
        );
        override_minutes(
            "OUTBREAK_TREATMENT_MINUTES",
            &mut self.timers.treatment_minutes,
        );
        override_minutes(
            "OUTBREAK_CHRONIC_DEADLINE_HOURS",
            &mut self.timers.chronic_deadline_hours,
        );
        override_minutes("OUTBREAK_WINDOW_MINUTES", &mut self.schedule.window_minutes);
    }

    /// Merge another config into this one.
    ///
    /// Field-by-field: every value in `other` that differs from the default
    /// wins. A layer therefore cannot reset a value back to its default.
    fn merge(mut self, other: Config) -> Self {
        let default_community = CommunityConfig::default();
        if other.community.id != default_community.id {
            self.community.id = other.community.id;
        }
        if other.community.infected_tag != default_community.infected_tag {
            self.community.infected_tag = other.community.infected_tag;
        }
        if other.community.chronic_tag != default_community.chronic_tag {
            self.community.chronic_tag = other.community.chronic_tag;
        }
        if other.community.quarantine_tag.is_some() {
            self.community.quarantine_tag = other.community.quarantine_tag;
        }
        if other.community.channel != default_community.channel {
            self.community.channel = other.community.channel;
        }
        if other.community.action_symbol != default_community.action_symbol {
            self.community.action_symbol = other.community.action_symbol;
        }

        let default_schedule = ScheduleConfig::default();
        if other.schedule.utc_offset_minutes != default_schedule.utc_offset_minutes {
            self.schedule.utc_offset_minutes = other.schedule.utc_offset_minutes;
        }
        if other.schedule.window_hours != default_schedule.window_hours {
            self.schedule.window_hours = other.schedule.window_hours;
        }
        if other.schedule.window_minutes != default_schedule.window_minutes {
            self.schedule.window_minutes = other.schedule.window_minutes;
        }

        let default_timers = TimersConfig::default();
        if other.timers.offer_lifetime_minutes != default_timers.offer_lifetime_minutes {
            self.timers.offer_lifetime_minutes = other.timers.offer_lifetime_minutes;
        }
        if other.timers.treatment_minutes != default_timers.treatment_minutes {
            self.timers.treatment_minutes = other.timers.treatment_minutes;
        }
        if other.timers.chronic_deadline_hours != default_timers.chronic_deadline_hours {
            self.timers.chronic_deadline_hours = other.timers.chronic_deadline_hours;
        }
        if other.timers.quarantine_after_minutes != default_timers.quarantine_after_minutes {
            self.timers.quarantine_after_minutes = other.timers.quarantine_after_minutes;
        }

        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }

        self
    }

    /// Check that everything the lifecycle needs is present and sane.
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (name, value) in [
            ("community.id", &self.community.id),
            ("community.infected_tag", &self.community.infected_tag),
            ("community.chronic_tag", &self.community.chronic_tag),
            ("community.channel", &self.community.channel),
            ("community.action_symbol", &self.community.action_symbol),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} is required", name));
            }
        }
        if !self.community.infected_tag.is_empty()
            && self.community.infected_tag == self.community.chronic_tag
        {
            problems.push("community.infected_tag and community.chronic_tag must differ".into());
        }
        if let Some(quarantine) = &self.community.quarantine_tag {
            if quarantine.trim().is_empty() {
                problems.push("community.quarantine_tag must not be empty when set".into());
            }
            if *quarantine == self.community.infected_tag
                || *quarantine == self.community.chronic_tag
            {
                problems.push(
                    "community.quarantine_tag must differ from the infected and chronic tags"
                        .into(),
                );
            }
        }

        if self.schedule.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            problems.push(format!(
                "schedule.utc_offset_minutes must be within +/-{}",
                MAX_UTC_OFFSET_MINUTES
            ));
        }
        if self.schedule.window_hours.is_empty() {
            problems.push("schedule.window_hours must not be empty".into());
        }
        if let Some(hour) = self.schedule.window_hours.iter().find(|h| **h > 23) {
            problems.push(format!("schedule.window_hours contains invalid hour {}", hour));
        }
        if self.schedule.window_minutes == 0 {
            problems.push("schedule.window_minutes must be positive".into());
        }
        if self.schedule.window_minutes > MAX_WINDOW_MINUTES {
            problems.push(format!(
                "schedule.window_minutes must be at most {}",
                MAX_WINDOW_MINUTES
            ));
        }

        for (name, value) in [
            ("timers.offer_lifetime_minutes", self.timers.offer_lifetime_minutes),
            ("timers.treatment_minutes", self.timers.treatment_minutes),
            ("timers.chronic_deadline_hours", self.timers.chronic_deadline_hours),
        ] {
            if value == 0 {
                problems.push(format!("{} must be positive", name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(OutbreakError::config(problems.join("; ")))
        }
    }

    /// Directory holding records, roster, outbox and history for this config.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(|| outbreak_home().map(|h| h.join("data")))
            .ok_or_else(|| OutbreakError::config("could not determine data directory"))
    }

    /// Write this configuration as TOML, atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| OutbreakError::storage(parent, e))?;
            }
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| OutbreakError::config(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| OutbreakError::storage(&temp_path, e))?;
        let file = fs::File::open(&temp_path).map_err(|e| OutbreakError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| OutbreakError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| OutbreakError::storage(path, e))?;
        Ok(())
    }
}

/// Read a non-empty environment variable.
fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Override a positive integer setting from the environment.
fn override_minutes(name: &str, target: &mut u32) {
    if let Ok(val) = env::var(name) {
        match val.parse::<u32>() {
            Ok(n) if n > 0 => *target = n,
            _ => tracing::warn!(
                "Invalid {} value '{}'. Expected a positive integer. Using '{}'.",
                name,
                val,
                target
            ),
        }
    }
}

/// Get the outbreak home directory.
///
/// `OUTBREAK_HOME` when set and non-empty, otherwise `~/.outbreak`, otherwise
/// a per-user directory under `/tmp`.
pub fn outbreak_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("OUTBREAK_HOME") {
        if home.is_empty() {
            tracing::warn!("OUTBREAK_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("OUTBREAK_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".outbreak"));
    }

    let fallback_path = fallback_outbreak_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_outbreak_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/outbreak-{}", uid))
}

#[cfg(not(unix))]
fn fallback_outbreak_home() -> PathBuf {
    std::env::temp_dir().join("outbreak")
}
