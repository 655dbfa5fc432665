//! Init command for outbreak.
//!
//! Scaffolds a local config file and the data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{outbreak_home, LOCAL_CONFIG_FILE};
use crate::platform::{FileRoster, Roster};

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Force overwrite existing files.
    pub force: bool,
    /// Community id written into the config; also seeds an empty roster.
    pub community: Option<String>,
    /// Data directory; defaults to `<outbreak_home>/data`.
    pub data_dir: Option<PathBuf>,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files that already existed (skipped).
    pub skipped: Vec<String>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: true,
            created,
            skipped,
            error: None,
        }
    }

    /// Create a failed output with partial success information.
    pub fn failure(error: impl Into<String>, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
            error: Some(error.into()),
        }
    }
}

/// Placeholder replaced by the community id.
const COMMUNITY_PLACEHOLDER: &str = "__COMMUNITY__";

/// Default outbreak.toml content.
const DEFAULT_CONFIG: &str = r#"# outbreak configuration
#
# Environment variables (OUTBREAK_*) override these values.

[community]
id = "__COMMUNITY__"
infected_tag = "Salomonisse"
chronic_tag = "Salomonisse Crônica"
# quarantine_tag = "Quarentena"
channel = "quarentena"
action_symbol = "💊"

# Windows open at these hours (civil time at utc_offset_minutes)
[schedule]
utc_offset_minutes = -180
window_hours = [0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22]
window_minutes = 10

[timers]
offer_lifetime_minutes = 10
treatment_minutes = 40
chronic_deadline_hours = 48
quarantine_after_minutes = 40

# [storage]
# data_dir = "/var/lib/outbreak"
"#;

/// The init command implementation.
pub struct InitCommand {
    cwd: PathBuf,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        // Local config
        let config_path = self.cwd.join(LOCAL_CONFIG_FILE);
        let community = options.community.as_deref().unwrap_or("");
        let content = DEFAULT_CONFIG.replace(COMMUNITY_PLACEHOLDER, community);
        match self.ensure_file(&config_path, &content, options.force) {
            Ok(true) => created.push(config_path.display().to_string()),
            Ok(false) => skipped.push(config_path.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        // Data directory
        let Some(data_dir) = options
            .data_dir
            .clone()
            .or_else(|| outbreak_home().map(|h| h.join("data")))
        else {
            return InitOutput::failure("could not determine data directory", created, skipped);
        };
        match self.ensure_dir(&data_dir) {
            Ok(true) => created.push(data_dir.display().to_string()),
            Ok(false) => skipped.push(data_dir.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        // Empty roster for the community
        if !community.is_empty() {
            let roster = FileRoster::for_community(&data_dir, community);
            if roster.path().exists() && !options.force {
                skipped.push(roster.path().display().to_string());
            } else {
                match roster.save(&Roster::default()) {
                    Ok(()) => created.push(roster.path().display().to_string()),
                    Err(e) => return InitOutput::failure(e.to_string(), created, skipped),
                }
            }
        }

        InitOutput::success(created, skipped)
    }

    /// Ensure a directory exists.
    /// Returns Ok(true) if created, Ok(false) if already exists.
    fn ensure_dir(&self, path: &Path) -> Result<bool, String> {
        if path.exists() {
            if path.is_dir() {
                return Ok(false);
            } else {
                return Err(format!("{} exists but is not a directory", path.display()));
            }
        }

        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Ensure a file exists with the given content.
    /// Returns Ok(true) if created, Ok(false) if already exists.
    fn ensure_file(&self, path: &Path, content: &str, force: bool) -> Result<bool, String> {
        if path.exists() && !force {
            return Ok(false);
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write file {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &InitOutput) -> String {
        let mut lines = Vec::new();

        if !output.success {
            lines.push(format!(
                "Init failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
            if !output.created.is_empty() {
                lines.push(String::new());
                lines.push("Partially created before failure:".to_string());
                for path in &output.created {
                    lines.push(format!("  {}", path));
                }
            }
            return lines.join("\n") + "\n";
        }

        if output.created.is_empty() {
            return "outbreak already initialized.\n".to_string();
        }

        lines.push("Created:".to_string());
        for path in &output.created {
            lines.push(format!("  {}", path));
        }
        if !output.skipped.is_empty() {
            lines.push("Already exists (skipped):".to_string());
            for path in &output.skipped {
                lines.push(format!("  {}", path));
            }
        }

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> InitOptions {
        InitOptions {
            community: Some("guild-1".to_string()),
            data_dir: Some(dir.path().join("data")),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_parses_and_validates() {
        let content = DEFAULT_CONFIG.replace(COMMUNITY_PLACEHOLDER, "guild-1");
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.community.id, "guild-1");
        assert_eq!(config.timers.treatment_minutes, 40);
        assert!(config.community.quarantine_tag.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_init_creates_config_data_dir_and_roster() {
        let dir = TempDir::new().unwrap();
        let cmd = InitCommand::new(dir.path());
        let output = cmd.run(&options(&dir));

        assert!(output.success);
        assert_eq!(output.created.len(), 3);
        let config = Config::load_from_file(&dir.path().join(LOCAL_CONFIG_FILE)).unwrap();
        assert_eq!(config.community.id, "guild-1");

        let roster = FileRoster::for_community(&dir.path().join("data"), "guild-1");
        assert!(roster.load().unwrap().members.is_empty());
    }

    #[test]
    fn test_init_skips_existing_files() {
        let dir = TempDir::new().unwrap();
        let cmd = InitCommand::new(dir.path());
        cmd.run(&options(&dir));

        let output = cmd.run(&options(&dir));
        assert!(output.success);
        assert!(output.created.is_empty());
        assert_eq!(output.skipped.len(), 3);
        assert_eq!(
            cmd.format_output(&output, &InitOptions::default()),
            "outbreak already initialized.\n"
        );
    }

    #[test]
    fn test_init_force_overwrites() {
        let dir = TempDir::new().unwrap();
        let cmd = InitCommand::new(dir.path());
        cmd.run(&options(&dir));
        fs::write(dir.path().join(LOCAL_CONFIG_FILE), "garbage").unwrap();

        let output = cmd.run(&InitOptions {
            force: true,
            ..options(&dir)
        });
        assert!(output.success);
        let content = fs::read_to_string(dir.path().join(LOCAL_CONFIG_FILE)).unwrap();
        assert!(content.contains("[community]"));
    }

    #[test]
    fn test_init_fails_when_data_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data"), "").unwrap();
        let cmd = InitCommand::new(dir.path());
        let output = cmd.run(&options(&dir));
        assert!(!output.success);
        assert!(output.error.unwrap().contains("not a directory"));
    }
}
