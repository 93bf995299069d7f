use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SettingsError;

pub const DEFAULT_SETTINGS_FILE: &str = "config.yaml";
const DEFAULT_SOURCE_LABEL: &str = "defaults";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub admin_steamid: String,
    pub available_maps: Vec<String>,
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
    pub max_rounds: u32,
    pub taunt_chance: f64,
    pub silence_seconds: u64,
    pub idle_comment_seconds: u64,
    pub commentary_cooldown_seconds: u64,
    pub score_flow_cooldown_seconds: u64,
    pub round_context_enabled: bool,
    pub rcon_host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub rcon_timeout_millis: u64,
    pub poll_interval_millis: u64,
    pub log_wait_seconds: u64,
    #[serde(skip)]
    pub config_source: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            admin_steamid: "[U:1:0]".to_string(),
            available_maps: ["dust2", "inferno", "ancient", "mirage"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            log_dir: PathBuf::from("logs"),
            data_dir: PathBuf::from("."),
            max_rounds: 24,
            taunt_chance: 0.25,
            silence_seconds: 30,
            idle_comment_seconds: 30,
            commentary_cooldown_seconds: 10,
            score_flow_cooldown_seconds: 8,
            round_context_enabled: true,
            rcon_host: "127.0.0.1".to_string(),
            rcon_port: 27015,
            rcon_password: String::new(),
            rcon_timeout_millis: 2_000,
            poll_interval_millis: 100,
            log_wait_seconds: 30,
            config_source: DEFAULT_SOURCE_LABEL.to_string(),
        }
    }
}

impl RuntimeSettings {
    pub fn rcon_address(&self) -> String {
        format!("{}:{}", self.rcon_host, self.rcon_port)
    }

    pub fn elo_path(&self) -> PathBuf {
        self.data_dir.join("player_elo.json")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("player_stats.json")
    }

    pub fn targets_path(&self) -> PathBuf {
        self.data_dir.join("targets.json")
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if self.max_rounds < 2 {
            return Err(SettingsError::Invalid {
                reason: format!("max_rounds must be at least 2, got {}", self.max_rounds),
            });
        }

        if !(0.0..=1.0).contains(&self.taunt_chance) {
            return Err(SettingsError::Invalid {
                reason: format!("taunt_chance must be within 0..=1, got {}", self.taunt_chance),
            });
        }

        Ok(self)
    }
}

/// Loads settings from a YAML file. A missing file yields the compiled defaults.
pub fn load_settings(path: &Path) -> Result<RuntimeSettings, SettingsError> {
    let raw_yaml = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::info!(
                settings_path = %path.display(),
                "Settings file not found, using defaults"
            );
            return Ok(RuntimeSettings::default());
        }
        Err(error) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source: error,
            });
        }
    };

    parse_settings(&raw_yaml, path)
}

fn parse_settings(raw_yaml: &str, path: &Path) -> Result<RuntimeSettings, SettingsError> {
    // An empty file deserializes to unit, not to a mapping.
    let mut settings = if raw_yaml.trim().is_empty() {
        RuntimeSettings::default()
    } else {
        serde_yaml::from_str::<RuntimeSettings>(raw_yaml).map_err(|error| SettingsError::Yaml {
            path: path.to_path_buf(),
            source: error,
        })?
    };
    settings.config_source = path.display().to_string();
    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::{load_settings, parse_settings, RuntimeSettings};
    use std::path::Path;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = load_settings(&temp_directory.path().join("absent.yaml"))
            .expect("Missing settings should not be an error");

        assert_eq!(settings.max_rounds, 24);
        assert_eq!(settings.config_source, "defaults");
        assert_eq!(settings.available_maps.len(), 4);
    }

    #[test]
    fn partial_yaml_overrides_only_given_fields() {
        let yaml = "max_rounds: 30\navailable_maps:\n  - nuke\n  - vertigo\nround_context_enabled: false\n";
        let settings = parse_settings(yaml, Path::new("config.yaml"))
            .expect("Expected settings to parse");

        assert_eq!(settings.max_rounds, 30);
        assert_eq!(settings.available_maps, vec!["nuke", "vertigo"]);
        assert!(!settings.round_context_enabled);
        assert_eq!(
            settings.commentary_cooldown_seconds,
            RuntimeSettings::default().commentary_cooldown_seconds
        );
        assert_eq!(settings.config_source, "config.yaml");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_settings("taunt_chance: 1.5\n", Path::new("config.yaml")).is_err());
        assert!(parse_settings("max_rounds: 1\n", Path::new("config.yaml")).is_err());
    }

    #[test]
    fn derives_record_paths_from_data_dir() {
        let settings = RuntimeSettings {
            data_dir: "/srv/cs2".into(),
            ..RuntimeSettings::default()
        };

        assert_eq!(
            settings.elo_path(),
            Path::new("/srv/cs2").join("player_elo.json")
        );
        assert_eq!(settings.rcon_address(), "127.0.0.1:27015");
    }
}
