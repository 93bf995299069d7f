//! Persisted player records: win/loss statistics, the name to steam id
//! directory, and the rating book, stored side by side in the data directory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::elo::{is_bot_name, EloBook, DEFAULT_K_FACTOR};
use crate::error::StorageError;
use crate::match_state::Team;
use crate::settings::RuntimeSettings;
use crate::storage::{read_json_file, write_json_atomic};

const STATS_SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    /// Fields written by other tools, kept as they are.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerRecord {
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> f64 {
        let matches_played = self.matches_played();
        if matches_played == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(matches_played)
    }
}

#[derive(Serialize)]
struct StatsDocument<'a> {
    schema_version: u32,
    players: &'a BTreeMap<String, PlayerRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsBook {
    players: BTreeMap<String, PlayerRecord>,
}

impl StatsBook {
    pub fn from_value(raw: &Value) -> Self {
        let Some(document) = raw.as_object() else {
            return Self::default();
        };
        let source = match document.get("players").and_then(Value::as_object) {
            Some(players) => players,
            None => document,
        };

        let players = source
            .iter()
            .filter(|(_, record)| record.is_object())
            .filter_map(|(name, record)| {
                match serde_json::from_value::<PlayerRecord>(record.clone()) {
                    Ok(record) => Some((name.to_ascii_uppercase(), record)),
                    Err(error) => {
                        tracing::warn!(player = %name, error = %error, "Skipping unreadable player record");
                        None
                    }
                }
            })
            .collect();
        Self { players }
    }

    pub fn get(&self, player: &str) -> Option<&PlayerRecord> {
        self.players.get(&player.to_ascii_uppercase())
    }

    pub fn all(&self) -> &BTreeMap<String, PlayerRecord> {
        &self.players
    }

    pub fn record_result(&mut self, player: &str, won: bool, steam_id: Option<&str>) {
        let record = self.players.entry(player.to_ascii_uppercase()).or_default();
        if let Some(steam_id) = steam_id {
            record.steam_id = Some(steam_id.to_string());
        }
        if won {
            record.wins += 1;
        } else {
            record.losses += 1;
        }
    }

    fn to_document(&self) -> StatsDocument<'_> {
        StatsDocument {
            schema_version: STATS_SCHEMA_VERSION,
            players: &self.players,
        }
    }
}

/// Name to steam id table, keys upper-cased. Stored as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDirectory {
    targets: BTreeMap<String, String>,
}

impl TargetDirectory {
    pub fn from_value(raw: &Value) -> Self {
        let Some(document) = raw.as_object() else {
            return Self::default();
        };

        let targets = document
            .iter()
            .map(|(name, steam_id)| {
                let steam_id = match steam_id {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (name.to_ascii_uppercase(), steam_id)
            })
            .collect();
        Self { targets }
    }

    pub fn get(&self, player: &str) -> Option<&str> {
        self.targets
            .get(&player.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn insert(&mut self, player: &str, steam_id: &str) {
        self.targets
            .insert(player.to_ascii_uppercase(), steam_id.to_string());
    }

    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.targets
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPaths {
    pub elo: PathBuf,
    pub stats: PathBuf,
    pub targets: PathBuf,
}

impl From<&RuntimeSettings> for RecordPaths {
    fn from(settings: &RuntimeSettings) -> Self {
        Self {
            elo: settings.elo_path(),
            stats: settings.stats_path(),
            targets: settings.targets_path(),
        }
    }
}

impl RecordPaths {
    pub fn in_directory(directory: &Path) -> Self {
        Self {
            elo: directory.join("player_elo.json"),
            stats: directory.join("player_stats.json"),
            targets: directory.join("targets.json"),
        }
    }
}

/// All three record stores plus where they live.
#[derive(Debug, Clone)]
pub struct PlayerRecords {
    pub elo: EloBook,
    pub stats: StatsBook,
    pub targets: TargetDirectory,
    paths: RecordPaths,
}

impl PlayerRecords {
    pub fn empty(paths: RecordPaths) -> Self {
        Self {
            elo: EloBook::new(),
            stats: StatsBook::default(),
            targets: TargetDirectory::default(),
            paths,
        }
    }

    pub fn load(paths: RecordPaths) -> Result<Self, StorageError> {
        let elo = EloBook::load(&paths.elo)?;
        let stats = read_json_file(&paths.stats)?
            .map(|raw| StatsBook::from_value(&raw))
            .unwrap_or_default();
        let targets = read_json_file(&paths.targets)?
            .map(|raw| TargetDirectory::from_value(&raw))
            .unwrap_or_default();

        tracing::info!(
            stats_players = stats.all().len(),
            targets = targets.all().len(),
            "Loaded player records"
        );
        Ok(Self {
            elo,
            stats,
            targets,
            paths,
        })
    }

    /// Steam id from the stats record first, then the directory.
    pub fn steam_id_for(&self, player: &str) -> Option<String> {
        self.stats
            .get(player)
            .and_then(|record| record.steam_id.clone())
            .or_else(|| self.targets.get(player).map(str::to_string))
    }

    pub fn is_bot(&self, player: &str) -> bool {
        is_bot_name(player) || self.steam_id_for(player).as_deref() == Some("BOT")
    }

    pub fn remember_target(&mut self, player: &str, steam_id: &str) {
        self.targets.insert(player, steam_id);
    }

    pub fn save_targets(&self) -> Result<(), StorageError> {
        write_json_atomic(&self.paths.targets, self.targets.all())?;
        tracing::debug!(entries = self.targets.all().len(), "Saved targets");
        Ok(())
    }

    /// Win/loss and rating update for a decided match. Bots are skipped.
    pub fn record_match(&mut self, winner: Team, ct_players: &[String], t_players: &[String]) {
        let ct_players = self.humans(ct_players);
        let t_players = self.humans(t_players);

        for (side, players) in [(Team::Ct, &ct_players), (Team::Terrorist, &t_players)] {
            for player in players {
                let steam_id = self.steam_id_for(player);
                self.stats
                    .record_result(player, side == winner, steam_id.as_deref());
            }
        }
        self.elo.update(
            winner,
            ct_players.as_slice(),
            t_players.as_slice(),
            DEFAULT_K_FACTOR,
        );
        tracing::info!(
            winner = %winner,
            ct_players = ct_players.len(),
            t_players = t_players.len(),
            "Recorded match result"
        );
    }

    pub fn save_all(&self) -> Result<(), StorageError> {
        write_json_atomic(&self.paths.stats, &self.stats.to_document())?;
        self.elo.save(&self.paths.elo)?;
        self.save_targets()
    }

    fn humans(&self, players: &[String]) -> Vec<String> {
        players
            .iter()
            .filter(|player| !self.is_bot(player))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{PlayerRecords, RecordPaths, StatsBook, TargetDirectory};
    use crate::match_state::Team;
    use serde_json::json;

    #[test]
    fn stats_read_both_layouts_and_keep_unknown_fields() {
        let versioned = StatsBook::from_value(&json!({
            "schema_version": 2,
            "players": {"alice": {"wins": 3, "losses": 1, "mvp": 7}}
        }));
        let alice = versioned.get("ALICE").expect("Expected alice record");
        assert_eq!(alice.wins, 3);
        assert_eq!(alice.extra.get("mvp"), Some(&json!(7)));
        assert!((alice.win_rate() - 0.75).abs() < f64::EPSILON);

        let legacy = StatsBook::from_value(&json!({"BOB": {"wins": 1}, "junk": 5}));
        assert_eq!(legacy.all().len(), 1);
        assert_eq!(legacy.get("bob").map(|record| record.losses), Some(0));
    }

    #[test]
    fn targets_are_case_insensitive() {
        let directory = TargetDirectory::from_value(&json!({"alice": "[U:1:1001]"}));
        assert_eq!(directory.get("Alice"), Some("[U:1:1001]"));
        assert_eq!(directory.get("bob"), None);
    }

    #[test]
    fn bot_detection_uses_name_and_resolved_id() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let mut records = PlayerRecords::empty(RecordPaths::in_directory(temp_directory.path()));
        records.remember_target("kev", "BOT");
        records.remember_target("alice", "[U:1:1001]");

        assert!(records.is_bot("BOT Moe"));
        assert!(records.is_bot("kev"));
        assert!(!records.is_bot("alice"));
        assert!(!records.is_bot("stranger"));
    }

    #[test]
    fn match_result_is_persisted_and_reloaded() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let paths = RecordPaths::in_directory(temp_directory.path());
        let mut records = PlayerRecords::empty(paths.clone());
        records.remember_target("alice", "[U:1:1001]");

        records.record_match(
            Team::Terrorist,
            &["bob".to_string(), "BOT Kev".to_string()],
            &["alice".to_string()],
        );
        records.save_all().expect("Expected records to save");

        let reloaded = PlayerRecords::load(paths).expect("Expected records to load");
        let alice = reloaded.stats.get("alice").expect("Expected alice record");
        assert_eq!((alice.wins, alice.losses), (1, 0));
        assert_eq!(alice.steam_id.as_deref(), Some("[U:1:1001]"));
        assert_eq!(reloaded.stats.get("bob").map(|record| record.losses), Some(1));
        assert!(reloaded.stats.get("BOT Kev").is_none());
        assert_eq!(reloaded.elo.get("alice"), 1025);
        assert_eq!(reloaded.elo.get("bob"), 975);
        assert_eq!(reloaded.targets.get("ALICE"), Some("[U:1:1001]"));
    }
}
