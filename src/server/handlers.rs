//! Request handlers for the JSON API.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::collector::CycleOptions;
use crate::config::parse_tier_list;
use crate::models::{CollectionResult, MatchRecord};
use crate::riot::client::is_supported_tier;
use crate::riot::SUPPORTED_TIERS;

use super::AppState;

const UNRANKED: &str = "UNRANKED";
const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

type ApiError = (StatusCode, Json<Value>);

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let summoners = state.store.load_players().map(|p| p.len()).unwrap_or(0);
    Json(json!({
        "ok": true,
        "has_api_key": state.collector.is_some(),
        "data_dir": state.settings.data_dir,
        "matches_file_exists": state.store.matches_path().exists(),
        "summoners_count": summoners,
    }))
}

pub async fn tiers() -> Json<Value> {
    let tiers: Vec<String> = SUPPORTED_TIERS
        .iter()
        .map(|t| t.to_ascii_uppercase())
        .collect();
    Json(json!({ "tiers": tiers }))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let matches = state.store.load_matches().unwrap_or_default();
    let summoners = state.store.load_players().map(|p| p.len()).unwrap_or(0);

    // Count a match once per distinct participant tier.
    let mut by_tier: HashMap<String, usize> = HashMap::new();
    for m in &matches {
        let mut tiers: Vec<String> = m
            .info
            .participants
            .iter()
            .map(|p| participant_tier(p.tier.as_deref()))
            .collect();
        tiers.sort();
        tiers.dedup();
        for t in tiers {
            *by_tier.entry(t).or_default() += 1;
        }
    }

    Json(json!({
        "total_matches": matches.len(),
        "total_summoners": summoners,
        "matches_by_tier": by_tier,
    }))
}

#[derive(Deserialize)]
pub struct MatchesQuery {
    pub limit: Option<usize>,
    pub tier: Option<String>,
}

pub async fn matches(
    State(state): State<AppState>,
    Query(query): Query<MatchesQuery>,
) -> Json<Value> {
    let all = state.store.load_matches().unwrap_or_default();
    let total = all.len();
    let page: Vec<&MatchRecord> = all.iter().take(clamp_limit(query.limit)).collect();
    Json(json!({ "matches": page, "total": total }))
}

pub async fn matches_by_tier(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Json<Value> {
    let want = tier.trim().to_ascii_uppercase();
    let filtered: Vec<MatchRecord> = state
        .store
        .load_matches()
        .unwrap_or_default()
        .into_iter()
        .filter(|m| match_has_tier(m, &want))
        .collect();
    Json(json!({ "matches": filtered, "total": filtered.len(), "tier": want }))
}

#[derive(Serialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub game_creation: i64,
    pub game_time_utc: String,
    /// Tier multiset of participants, e.g. "CHALLENGER×3, MASTER×1".
    pub tier_summary: String,
    pub players: Vec<PlayerSummary>,
}

#[derive(Serialize)]
pub struct PlayerSummary {
    pub name: String,
    pub tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<i64>,
    pub augments: Vec<String>,
    /// Top 3 traits by (tier_current, num_units).
    pub top_traits: Vec<TraitSummary>,
    /// Top 3 units by star level.
    pub core_units: Vec<UnitSummary>,
}

#[derive(Serialize)]
pub struct TraitSummary {
    pub name: Option<String>,
    pub tier_current: i64,
    pub num_units: i64,
}

#[derive(Serialize)]
pub struct UnitSummary {
    pub name: Option<String>,
    pub star: i64,
    pub items: Vec<String>,
}

pub async fn matches_summary(
    State(state): State<AppState>,
    Query(query): Query<MatchesQuery>,
) -> Json<Value> {
    let want = query
        .tier
        .as_deref()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty());

    let all: Vec<MatchRecord> = state
        .store
        .load_matches()
        .unwrap_or_default()
        .into_iter()
        .filter(|m| want.as_deref().map_or(true, |t| match_has_tier(m, t)))
        .collect();
    let total = all.len();

    // puuid -> display name, from the identity cache
    let players = state.store.load_players().unwrap_or_default();
    let name_map: HashMap<String, String> = players
        .values()
        .filter_map(|p| p.puuid.clone().map(|puuid| (puuid, p.display_name())))
        .collect();

    let summaries: Vec<MatchSummary> = all
        .iter()
        .take(clamp_limit(query.limit))
        .map(|m| summarize_match(m, &name_map))
        .collect();

    Json(json!({ "matches": summaries, "total": total }))
}

#[derive(Deserialize)]
pub struct CollectQuery {
    pub region: Option<String>,
    pub players: Option<usize>,
    pub per_player: Option<u32>,
    /// Comma-separated tier list; defaults to the configured tiers.
    pub tiers: Option<String>,
}

pub async fn collect(
    State(state): State<AppState>,
    Query(query): Query<CollectQuery>,
) -> Result<Json<CollectionResult>, ApiError> {
    let Some(collector) = state.collector.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "RIOT_API_KEY is not configured" })),
        ));
    };

    let defaults = state.settings.cycle_options();
    let tiers = match query.tiers.as_deref() {
        Some(raw) => parse_tier_list(raw),
        None => defaults.tiers,
    };
    for tier in &tiers {
        if !is_supported_tier(tier) {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("unsupported tier: {tier}") })),
            ));
        }
    }

    let opts = CycleOptions {
        region: query.region.unwrap_or(defaults.region),
        max_players: query.players.unwrap_or(defaults.max_players),
        max_matches_per_player: query.per_player.unwrap_or(defaults.max_matches_per_player),
        tiers,
    };
    Ok(Json(collector.run_cycle(&opts).await))
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn participant_tier(tier: Option<&str>) -> String {
    tier.filter(|t| !t.is_empty())
        .unwrap_or(UNRANKED)
        .to_ascii_uppercase()
}

fn match_has_tier(m: &MatchRecord, want: &str) -> bool {
    m.info
        .participants
        .iter()
        .any(|p| participant_tier(p.tier.as_deref()) == want)
}

fn string_list(extra: &Map<String, Value>, key: &str) -> Vec<String> {
    extra
        .get(key)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn top_traits(extra: &Map<String, Value>) -> Vec<TraitSummary> {
    let mut traits: Vec<TraitSummary> = extra
        .get("traits")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|t| TraitSummary {
                    name: t.get("name").and_then(Value::as_str).map(str::to_string),
                    tier_current: t.get("tier_current").and_then(Value::as_i64).unwrap_or(0),
                    num_units: t.get("num_units").and_then(Value::as_i64).unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();
    traits.sort_by(|a, b| (b.tier_current, b.num_units).cmp(&(a.tier_current, a.num_units)));
    traits.truncate(3);
    traits
}

fn core_units(extra: &Map<String, Value>) -> Vec<UnitSummary> {
    let mut units: Vec<UnitSummary> = extra
        .get("units")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|u| UnitSummary {
                    name: u
                        .get("character_id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    star: u.get("tier").and_then(Value::as_i64).unwrap_or(0),
                    items: u
                        .get("itemNames")
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();
    units.sort_by(|a, b| b.star.cmp(&a.star));
    units.truncate(3);
    units
}

fn summarize_match(m: &MatchRecord, name_map: &HashMap<String, String>) -> MatchSummary {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for p in &m.info.participants {
        let tier = participant_tier(p.tier.as_deref());
        match counts.iter_mut().find(|(t, _)| *t == tier) {
            Some((_, n)) => *n += 1,
            None => counts.push((tier, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let tier_summary = counts
        .iter()
        .map(|(t, n)| format!("{t}×{n}"))
        .collect::<Vec<_>>()
        .join(", ");

    let players = m
        .info
        .participants
        .iter()
        .map(|p| {
            let puuid = p.puuid.as_deref().unwrap_or("");
            let name = name_map.get(puuid).cloned().unwrap_or_else(|| {
                let prefix: String = puuid.chars().take(8).collect();
                format!("{prefix}…")
            });
            PlayerSummary {
                name,
                tier: participant_tier(p.tier.as_deref()),
                placement: p.placement,
                augments: string_list(&p.extra, "augments"),
                top_traits: top_traits(&p.extra),
                core_units: core_units(&p.extra),
            }
        })
        .collect();

    let game_time_utc = Utc
        .timestamp_millis_opt(m.info.game_creation)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    MatchSummary {
        match_id: m.metadata.match_id.clone(),
        game_creation: m.info.game_creation,
        game_time_utc,
        tier_summary,
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> MatchRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn tier_summary_counts_duplicates() {
        let m = record(json!({
            "metadata": {"match_id": "M1"},
            "info": {
                "gameCreation": 1700000000000i64,
                "participants": [
                    {"puuid": "A", "tier": "CHALLENGER"},
                    {"puuid": "B", "tier": "CHALLENGER"},
                    {"puuid": "C", "tier": "MASTER"},
                    {"puuid": "D"}
                ]
            }
        }));
        let summary = summarize_match(&m, &HashMap::new());
        assert_eq!(summary.tier_summary, "CHALLENGER×2, MASTER×1, UNRANKED×1");
        assert_eq!(summary.players.len(), 4);
        assert_eq!(summary.players[3].tier, "UNRANKED");
    }

    #[test]
    fn summary_uses_cached_names_with_puuid_fallback() {
        let m = record(json!({
            "metadata": {"match_id": "M1"},
            "info": {"participants": [{"puuid": "known-puuid"}, {"puuid": "unknown-puuid"}]}
        }));
        let mut names = HashMap::new();
        names.insert("known-puuid".to_string(), "Alice".to_string());
        let summary = summarize_match(&m, &names);
        assert_eq!(summary.players[0].name, "Alice");
        assert_eq!(summary.players[1].name, "unknown-…");
    }

    #[test]
    fn summary_keeps_augments_top_traits_and_core_units() {
        let m = record(json!({
            "metadata": {"match_id": "M1"},
            "info": {"participants": [{
                "puuid": "A",
                "tier": "CHALLENGER",
                "placement": 1,
                "augments": ["TFT9_Augment_A", "TFT9_Augment_B"],
                "traits": [
                    {"name": "Sniper", "tier_current": 1, "num_units": 2},
                    {"name": "Sorcerer", "tier_current": 3, "num_units": 6},
                    {"name": "Bruiser", "tier_current": 2, "num_units": 4},
                    {"name": "Gunner", "tier_current": 2, "num_units": 2}
                ],
                "units": [
                    {"character_id": "TFT9_Ahri", "tier": 2, "itemNames": ["JG"]},
                    {"character_id": "TFT9_Sona", "tier": 1},
                    {"character_id": "TFT9_KSante", "tier": 3, "itemNames": ["BT", "GA"]},
                    {"character_id": "TFT9_Poppy", "tier": 1}
                ]
            }]}
        }));
        let summary = summarize_match(&m, &HashMap::new());
        let p = &summary.players[0];

        assert_eq!(p.augments, vec!["TFT9_Augment_A", "TFT9_Augment_B"]);

        // traits ranked by (tier_current, num_units), truncated to 3
        let trait_names: Vec<_> = p.top_traits.iter().map(|t| t.name.as_deref()).collect();
        assert_eq!(
            trait_names,
            vec![Some("Sorcerer"), Some("Bruiser"), Some("Gunner")]
        );
        assert_eq!(p.top_traits[0].num_units, 6);

        // units ranked by star, truncated to 3
        assert_eq!(p.core_units.len(), 3);
        assert_eq!(p.core_units[0].name.as_deref(), Some("TFT9_KSante"));
        assert_eq!(p.core_units[0].star, 3);
        assert_eq!(p.core_units[0].items, vec!["BT", "GA"]);
        assert_eq!(p.core_units[1].name.as_deref(), Some("TFT9_Ahri"));
        assert!(p.core_units[2].items.is_empty());
    }

    #[test]
    fn summary_without_board_data_yields_empty_lists() {
        let m = record(json!({
            "metadata": {"match_id": "M1"},
            "info": {"participants": [{"puuid": "A"}]}
        }));
        let p = &summarize_match(&m, &HashMap::new()).players[0];
        assert!(p.augments.is_empty());
        assert!(p.top_traits.is_empty());
        assert!(p.core_units.is_empty());
    }

    #[test]
    fn tier_filter_matches_any_participant() {
        let m = record(json!({
            "metadata": {"match_id": "M1"},
            "info": {"participants": [{"puuid": "A", "tier": "MASTER"}]}
        }));
        assert!(match_has_tier(&m, "MASTER"));
        assert!(!match_has_tier(&m, "CHALLENGER"));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(5000)), 200);
    }
}
