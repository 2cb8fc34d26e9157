//! Typed records for the collection pipeline.
//!
//! Upstream payloads are dynamic JSON; the fields the pipeline actually reads
//! are named here, and everything else rides along in a flattened map so the
//! full payload survives a round trip to the durable log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity and ranking metadata for one player, keyed by the stable
/// summoner id. Owned by the store: created on first resolution, tier
/// refreshed on later cycles, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerRecord {
    /// Display name: `name`, then `gameName#tagLine`, then a puuid prefix.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let (Some(game), Some(tag)) = (self.game_name.as_deref(), self.tag_line.as_deref()) {
            if !game.is_empty() && !tag.is_empty() {
                return format!("{game}#{tag}");
            }
        }
        let prefix: String = self
            .puuid
            .as_deref()
            .unwrap_or(&self.id)
            .chars()
            .take(8)
            .collect();
        format!("{prefix}…")
    }
}

/// One candidate from a tier listing. Transient: lives only inside a single
/// collection cycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    #[serde(default)]
    pub summoner_id: Option<String>,
    #[serde(default)]
    pub league_points: i64,
    /// Tier the entry was listed under, uppercased. The raw entry may not
    /// carry it, so the client tags it with the requested tier.
    #[serde(default)]
    pub tier: Option<String>,
}

/// One completed match, as fetched upstream plus pipeline annotations.
/// Append-only once written to the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
    /// Puuid whose match-id listing caused this match to be collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_for: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub match_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchInfo {
    #[serde(default, rename = "gameCreation")]
    pub game_creation: i64,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puuid: Option<String>,
    /// Resolved ladder tier, injected by the collection cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary of one collection cycle, returned to the trigger (HTTP or
/// scheduler). Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResult {
    pub platform_region: String,
    pub tiers: Vec<String>,
    pub players_collected: usize,
    pub matches_fetched: usize,
    pub duration_sec: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CycleFailure>,
}

/// A per-item failure recorded during a cycle stage. The cycle continues past
/// these; they are returned so callers and tests can see partial progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleFailure {
    pub stage: CycleStage,
    /// The tier, summoner id, puuid, or match id the failure applies to.
    pub item: String,
    pub error: String,
}

impl CycleFailure {
    pub fn new(stage: CycleStage, item: impl Into<String>, error: impl ToString) -> Self {
        Self {
            stage,
            item: item.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    TierListing,
    IdentityResolution,
    MatchListing,
    MatchFetch,
    Persistence,
}
