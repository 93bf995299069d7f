use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StorageError;
use crate::match_state::Team;
use crate::storage::{read_json_file, write_json_atomic};

pub const DEFAULT_RATING: i64 = 1000;
pub const DEFAULT_K_FACTOR: i64 = 25;
const ELO_SCHEMA_VERSION: u32 = 2;

/// Bot names as the server prints them (`BOT Moe`, `BOT`).
pub fn is_bot_name(name: &str) -> bool {
    name.trim().to_ascii_uppercase().starts_with("BOT")
}

#[derive(Serialize)]
struct EloDocument<'a> {
    schema_version: u32,
    ratings: BTreeMap<&'a str, i64>,
}

/// Player ratings keyed by upper-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EloBook {
    ratings: BTreeMap<String, i64>,
}

impl EloBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts both `{"schema_version":2,"ratings":{..}}` and the legacy flat
    /// `{NAME: rating}` layout. Entries that are not numbers are skipped.
    pub fn from_value(raw: &Value) -> Self {
        let Some(document) = raw.as_object() else {
            return Self::new();
        };
        let source = match document.get("ratings").and_then(Value::as_object) {
            Some(ratings) => ratings,
            None => document,
        };

        let ratings = source
            .iter()
            .filter_map(|(name, rating)| Some((name.to_ascii_uppercase(), rating_of(rating)?)))
            .collect();
        Self { ratings }
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let book = match read_json_file(path)? {
            Some(raw) => Self::from_value(&raw),
            None => Self::new(),
        };
        tracing::info!(path = %path.display(), players = book.ratings.len(), "Loaded ratings");
        Ok(book)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let document = EloDocument {
            schema_version: ELO_SCHEMA_VERSION,
            ratings: self
                .ratings
                .iter()
                .filter(|(name, _)| !is_bot_name(name))
                .map(|(name, rating)| (name.as_str(), *rating))
                .collect(),
        };
        write_json_atomic(path, &document)?;
        tracing::debug!(path = %path.display(), players = document.ratings.len(), "Saved ratings");
        Ok(())
    }

    pub fn get(&self, player: &str) -> i64 {
        self.ratings
            .get(&player.to_ascii_uppercase())
            .copied()
            .unwrap_or(DEFAULT_RATING)
    }

    pub fn team_total<S: AsRef<str>>(&self, players: &[S]) -> i64 {
        players.iter().map(|player| self.get(player.as_ref())).sum()
    }

    pub fn all(&self) -> &BTreeMap<String, i64> {
        &self.ratings
    }

    /// Winners gain `k_factor`, losers lose it. Bots are left out and unseen
    /// players start from the default rating.
    pub fn update<S: AsRef<str>>(
        &mut self,
        winner: Team,
        ct_players: &[S],
        t_players: &[S],
        k_factor: i64,
    ) {
        for (side, players) in [(Team::Ct, ct_players), (Team::Terrorist, t_players)] {
            let delta = if side == winner { k_factor } else { -k_factor };
            for player in players.iter().map(AsRef::as_ref) {
                if is_bot_name(player) {
                    continue;
                }
                let rating = self
                    .ratings
                    .entry(player.to_ascii_uppercase())
                    .or_insert(DEFAULT_RATING);
                *rating += delta;
            }
        }
        tracing::debug!(winner = %winner, "Ratings updated");
    }
}

fn rating_of(value: &Value) -> Option<i64> {
    if let Some(rating) = value.as_i64() {
        return Some(rating);
    }
    if let Some(rating) = value.as_f64() {
        return Some(rating.trunc() as i64);
    }
    value.as_str()?.trim().parse().ok()
}
