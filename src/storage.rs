//! Durable stores: append-only JSONL match log and JSON identity cache.
//!
//! The match log is the dedup source of truth: a match id present in the log
//! is never fetched again. Readers tolerate and skip unparsable lines rather
//! than failing the whole load. The identity cache is a single JSON array,
//! rewritten wholesale when it changes.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::models::{MatchRecord, PlayerRecord};

pub const MATCHES_FILE: &str = "matches.jsonl";
pub const PLAYERS_FILE: &str = "summoners.json";

#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = data_dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { data_dir: dir })
    }

    pub fn matches_path(&self) -> PathBuf {
        self.data_dir.join(MATCHES_FILE)
    }

    pub fn players_path(&self) -> PathBuf {
        self.data_dir.join(PLAYERS_FILE)
    }

    /// Full identity cache keyed by stable summoner id. A missing file is an
    /// empty cache.
    pub fn load_players(&self) -> Result<HashMap<String, PlayerRecord>> {
        let path = self.players_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&path)?;
        let players: Vec<PlayerRecord> = serde_json::from_str(&raw)?;
        Ok(players.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Rewrite the identity cache wholesale.
    pub fn save_players(&self, players: &HashMap<String, PlayerRecord>) -> Result<()> {
        let mut list: Vec<&PlayerRecord> = players.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        let body = serde_json::to_string_pretty(&list)?;
        fs::write(self.players_path(), body)?;
        Ok(())
    }

    /// Every match id already in the log. Malformed lines are skipped.
    pub fn known_match_ids(&self) -> Result<HashSet<String>> {
        let path = self.matches_path();
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let file = fs::File::open(&path)?;
        let mut ids = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MatchRecord>(&line) {
                Ok(m) => {
                    ids.insert(m.metadata.match_id);
                }
                Err(e) => warn!(error = %e, "skipping unparsable match log line"),
            }
        }
        Ok(ids)
    }

    /// Append a batch of match records, one JSON object per line.
    pub fn append_matches(&self, matches: &[MatchRecord]) -> Result<()> {
        if matches.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.matches_path())?;
        for m in matches {
            let line = serde_json::to_string(m)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// All parsable match records, newest first by `info.gameCreation`.
    pub fn load_matches(&self) -> Result<Vec<MatchRecord>> {
        let path = self.matches_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path)?;
        let mut matches = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MatchRecord>(&line) {
                Ok(m) => matches.push(m),
                Err(e) => warn!(error = %e, "skipping unparsable match log line"),
            }
        }
        matches.sort_by(|a, b| b.info.game_creation.cmp(&a.info.game_creation));
        Ok(matches)
    }
}
