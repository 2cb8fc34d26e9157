//! Runtime settings, loaded from the process environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::CycleOptions;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory for the match log and identity cache.
    pub data_dir: PathBuf,
    /// Riot API credential. Every fetch requires one; read-only serving does
    /// not.
    pub api_key: Option<String>,
    /// Platform region collection targets by default.
    pub region: String,
    pub max_players: usize,
    pub max_matches_per_player: u32,
    pub tiers: Vec<String>,
    /// Background collection interval; `None` disables the scheduler.
    pub collect_interval: Option<Duration>,
    /// Admission ceiling for the one-second window.
    pub limit_per_second: usize,
    /// Admission ceiling for the two-minute window.
    pub limit_per_two_minutes: usize,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_key: None,
            region: "kr".to_string(),
            max_players: 50,
            max_matches_per_player: 10,
            tiers: vec![
                "challenger".to_string(),
                "grandmaster".to_string(),
                "master".to_string(),
            ],
            collect_interval: None,
            limit_per_second: 19,
            limit_per_two_minutes: 99,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut s = Self::default();

        if let Some(dir) = non_empty(env::var("DATA_DIR").ok()) {
            s.data_dir = PathBuf::from(dir);
        }
        s.api_key = non_empty(env::var("RIOT_API_KEY").ok());
        if let Some(region) = non_empty(env::var("COLLECT_REGION").ok()) {
            s.region = region;
        }
        if let Some(v) = parse_env("COLLECT_PLAYERS") {
            s.max_players = v;
        }
        if let Some(v) = parse_env("COLLECT_PER_PLAYER") {
            s.max_matches_per_player = v;
        }
        if let Some(raw) = non_empty(env::var("COLLECT_TIERS").ok()) {
            let tiers = parse_tier_list(&raw);
            if !tiers.is_empty() {
                s.tiers = tiers;
            }
        }
        if let Some(secs) = parse_env::<u64>("COLLECT_INTERVAL_SEC") {
            if secs > 0 {
                s.collect_interval = Some(Duration::from_secs(secs));
            }
        }
        // Admission ceilings of 0 would never admit anything; floor at 1.
        if let Some(v) = parse_env::<usize>("RIOT_LIMIT_PER_SEC") {
            s.limit_per_second = v.max(1);
        }
        if let Some(v) = parse_env::<usize>("RIOT_LIMIT_PER_2MIN") {
            s.limit_per_two_minutes = v.max(1);
        }

        s
    }

    /// Default cycle parameters for this configuration.
    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            region: self.region.clone(),
            max_players: self.max_players,
            max_matches_per_player: self.max_matches_per_player,
            tiers: self.tiers.clone(),
        }
    }
}

/// Split a comma-separated tier list, lowercased, empty items dropped.
pub fn parse_tier_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
