//! One ingestion pass: ladder candidates → identities → new match ids →
//! fetch, annotate, persist.
//!
//! Every per-item failure is recorded in the returned [`CollectionResult`]
//! and never aborts the cycle; the only serialization point with concurrent
//! cycles is the shared admission controller.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::{
    CollectionResult, CycleFailure, CycleStage, LeagueEntry, MatchRecord, PlayerRecord,
};
use crate::riot::RiotClient;
use crate::storage::{Store, MATCHES_FILE, PLAYERS_FILE};

const UNRANKED: &str = "UNRANKED";

/// Parameters for one collection cycle.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub region: String,
    pub max_players: usize,
    pub max_matches_per_player: u32,
    /// Tier listing order matters: for a player appearing in several
    /// listings, the last-processed tier wins the cache update.
    pub tiers: Vec<String>,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            region: "kr".to_string(),
            max_players: 50,
            max_matches_per_player: 10,
            tiers: vec![
                "challenger".to_string(),
                "grandmaster".to_string(),
                "master".to_string(),
            ],
        }
    }
}

pub struct Collector {
    client: RiotClient,
    store: Store,
}

impl Collector {
    pub fn new(client: RiotClient, store: Store) -> Self {
        Self { client, store }
    }

    /// Run one full cycle and return its summary. Always terminates; per-item
    /// failures are accumulated, not propagated.
    pub async fn run_cycle(&self, opts: &CycleOptions) -> CollectionResult {
        let started = Instant::now();
        let mut failures: Vec<CycleFailure> = Vec::new();

        let entries = self.resolve_candidates(opts, &mut failures).await;

        let mut players = match self.store.load_players() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to load identity cache, starting empty");
                failures.push(CycleFailure::new(CycleStage::Persistence, PLAYERS_FILE, &e));
                HashMap::new()
            }
        };
        let snapshot = players.clone();
        let (puuids, tier_by_puuid) = self
            .resolve_identities(opts, &entries, &mut players, &mut failures)
            .await;

        let new_ids = self.resolve_match_ids(opts, &puuids, &mut failures).await;

        let fetched = self
            .fetch_matches(opts, &new_ids, &tier_by_puuid, &mut failures)
            .await;
        let matches_fetched = fetched.len();

        if let Err(e) = self.store.append_matches(&fetched) {
            warn!(error = %e, "failed to append match log");
            failures.push(CycleFailure::new(CycleStage::Persistence, MATCHES_FILE, &e));
        }
        if players != snapshot {
            if let Err(e) = self.store.save_players(&players) {
                warn!(error = %e, "failed to save identity cache");
                failures.push(CycleFailure::new(CycleStage::Persistence, PLAYERS_FILE, &e));
            }
        }

        let result = CollectionResult {
            platform_region: opts.region.clone(),
            tiers: opts.tiers.clone(),
            players_collected: puuids.len(),
            matches_fetched,
            duration_sec: (started.elapsed().as_secs_f64() * 100.0).round() / 100.0,
            failures,
        };
        info!(
            region = %result.platform_region,
            players = result.players_collected,
            matches = result.matches_fetched,
            failures = result.failures.len(),
            duration_sec = result.duration_sec,
            "collection cycle finished"
        );
        result
    }

    /// Stage 1: list every configured tier, merge, sort by ranking points
    /// descending, truncate to the player cap. A failed tier contributes
    /// nothing.
    async fn resolve_candidates(
        &self,
        opts: &CycleOptions,
        failures: &mut Vec<CycleFailure>,
    ) -> Vec<LeagueEntry> {
        let mut entries: Vec<LeagueEntry> = Vec::new();
        for tier in &opts.tiers {
            match self.client.league_entries(&opts.region, tier).await {
                Ok(mut batch) => entries.append(&mut batch),
                Err(e) => {
                    warn!(%tier, error = %e, "tier listing failed");
                    failures.push(CycleFailure::new(CycleStage::TierListing, tier, &e));
                }
            }
        }
        entries.sort_by(|a, b| b.league_points.cmp(&a.league_points));
        entries.truncate(opts.max_players);
        entries
    }

    /// Stage 2: resolve or refresh the identity cache entry per candidate.
    /// Returns the distinct puuids in candidate order plus the puuid→tier
    /// map used for match annotation in stage 4.
    async fn resolve_identities(
        &self,
        opts: &CycleOptions,
        entries: &[LeagueEntry],
        players: &mut HashMap<String, PlayerRecord>,
        failures: &mut Vec<CycleFailure>,
    ) -> (Vec<String>, HashMap<String, String>) {
        let mut puuids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut tier_by_puuid: HashMap<String, String> = HashMap::new();

        for entry in entries {
            let Some(id) = entry.summoner_id.as_deref() else {
                continue;
            };
            let tier = entry
                .tier
                .clone()
                .unwrap_or_else(|| UNRANKED.to_string());

            if let Some(existing) = players.get_mut(id) {
                // last-write-wins on tier; name stays as first resolved
                existing.tier = Some(tier.clone());
                if let Some(puuid) = existing.puuid.clone() {
                    tier_by_puuid.insert(puuid.clone(), tier);
                    if seen.insert(puuid.clone()) {
                        puuids.push(puuid);
                    }
                }
                continue;
            }

            match self.client.summoner_by_id(&opts.region, id).await {
                Ok(Some(mut record)) => {
                    record.tier = Some(tier.clone());
                    if let Some(puuid) = record.puuid.clone() {
                        tier_by_puuid.insert(puuid.clone(), tier);
                        if seen.insert(puuid.clone()) {
                            puuids.push(puuid);
                        }
                    }
                    players.insert(record.id.clone(), record);
                }
                Ok(None) => debug!(summoner = id, "summoner not found upstream, skipping"),
                Err(e) => {
                    warn!(summoner = id, error = %e, "identity resolution failed");
                    failures.push(CycleFailure::new(CycleStage::IdentityResolution, id, &e));
                }
            }
        }

        (puuids, tier_by_puuid)
    }

    /// Stage 3: list recent match ids per player, dropping ids already in the
    /// log or already seen earlier in this cycle. Returns `(match id, source
    /// puuid)` pairs.
    async fn resolve_match_ids(
        &self,
        opts: &CycleOptions,
        puuids: &[String],
        failures: &mut Vec<CycleFailure>,
    ) -> Vec<(String, String)> {
        let known = match self.store.known_match_ids() {
            Ok(k) => k,
            Err(e) => {
                warn!(error = %e, "failed to read match log for dedup");
                failures.push(CycleFailure::new(CycleStage::Persistence, MATCHES_FILE, &e));
                HashSet::new()
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut new_ids: Vec<(String, String)> = Vec::new();
        for puuid in puuids {
            match self
                .client
                .match_ids(&opts.region, puuid, opts.max_matches_per_player)
                .await
            {
                Ok(ids) => {
                    for mid in ids {
                        if known.contains(&mid) || !seen.insert(mid.clone()) {
                            continue;
                        }
                        new_ids.push((mid, puuid.clone()));
                    }
                }
                Err(e) => {
                    warn!(%puuid, error = %e, "match id listing failed");
                    failures.push(CycleFailure::new(CycleStage::MatchListing, puuid, &e));
                }
            }
        }
        new_ids
    }

    /// Stage 4: fetch detail for each new id and annotate participants with
    /// their resolved tier plus the puuid whose listing triggered collection.
    async fn fetch_matches(
        &self,
        opts: &CycleOptions,
        new_ids: &[(String, String)],
        tier_by_puuid: &HashMap<String, String>,
        failures: &mut Vec<CycleFailure>,
    ) -> Vec<MatchRecord> {
        let mut fetched: Vec<MatchRecord> = Vec::new();
        for (mid, source) in new_ids {
            match self.client.get_match(&opts.region, mid).await {
                Ok(mut m) => {
                    for p in &mut m.info.participants {
                        match p.puuid.as_ref().and_then(|id| tier_by_puuid.get(id)) {
                            Some(tier) => p.tier = Some(tier.clone()),
                            None => {
                                if p.tier.is_none() {
                                    p.tier = Some(UNRANKED.to_string());
                                }
                            }
                        }
                    }
                    m.collected_for = Some(source.clone());
                    fetched.push(m);
                }
                Err(e) => {
                    warn!(match_id = %mid, error = %e, "match fetch failed");
                    failures.push(CycleFailure::new(CycleStage::MatchFetch, mid, &e));
                }
            }
        }
        fetched
    }
}
