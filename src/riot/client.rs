//! Endpoint shaping for the TFT league and match APIs.
//!
//! League and summoner lookups go to the platform host (`kr`, `euw1`, ...);
//! match lookups go to the regional routing group (`americas`, `europe`,
//! `asia`).

use reqwest::StatusCode;
use serde::Deserialize;

use super::http_client::{ApiResponse, RiotHttpClient};
use crate::error::{Error, Result};
use crate::models::{LeagueEntry, MatchRecord, PlayerRecord};

/// Closed set of tiers the ladder listing supports.
pub const SUPPORTED_TIERS: [&str; 3] = ["challenger", "grandmaster", "master"];

pub fn is_supported_tier(tier: &str) -> bool {
    SUPPORTED_TIERS.contains(&tier.trim().to_ascii_lowercase().as_str())
}

/// Regional routing group for match endpoints. Unknown regions fall through
/// to "asia" so the mapping stays total.
pub fn regional_routing(platform_region: &str) -> &'static str {
    match platform_region.to_ascii_lowercase().as_str() {
        "na" | "na1" | "br" | "br1" | "lan" | "la1" | "las" | "la2" | "oc1" => "americas",
        "euw" | "euw1" | "eune" | "eun1" | "tr" | "tr1" | "ru" => "europe",
        _ => "asia",
    }
}

#[derive(Deserialize)]
struct LeagueList {
    #[serde(default)]
    entries: Vec<LeagueEntry>,
}

/// Thin shaping layer over [`RiotHttpClient`] for the four pipeline
/// operations.
#[derive(Clone)]
pub struct RiotClient {
    http: RiotHttpClient,
}

impl RiotClient {
    pub fn new(http: RiotHttpClient) -> Self {
        Self { http }
    }

    /// Current ladder entries for one tier, each tagged with the uppercased
    /// tier (the raw entry does not always carry it).
    pub async fn league_entries(
        &self,
        platform_region: &str,
        tier: &str,
    ) -> Result<Vec<LeagueEntry>> {
        let t = tier.trim().to_ascii_lowercase();
        if !SUPPORTED_TIERS.contains(&t.as_str()) {
            return Err(Error::UnsupportedTier(tier.to_string()));
        }
        let url = format!("https://{platform_region}.api.riotgames.com/tft/league/v1/{t}");
        let resp = check(self.http.get(&url).await?, &url)?;
        let league: LeagueList = resp.json()?;

        let tag = t.to_ascii_uppercase();
        Ok(league
            .entries
            .into_iter()
            .map(|mut e| {
                e.tier = Some(tag.clone());
                e
            })
            .collect())
    }

    /// `None` on 404: the summoner legitimately no longer exists.
    pub async fn summoner_by_id(
        &self,
        platform_region: &str,
        summoner_id: &str,
    ) -> Result<Option<PlayerRecord>> {
        let url = format!(
            "https://{platform_region}.api.riotgames.com/tft/summoner/v1/summoners/{summoner_id}"
        );
        let resp = self.http.get(&url).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp, &url)?;
        let mut record: PlayerRecord = resp.json()?;
        if record.id.is_empty() {
            record.id = summoner_id.to_string();
        }
        Ok(Some(record))
    }

    /// Recent match ids for a puuid, most-recent-first as served upstream.
    pub async fn match_ids(
        &self,
        platform_region: &str,
        puuid: &str,
        count: u32,
    ) -> Result<Vec<String>> {
        let regional = regional_routing(platform_region);
        let url = format!(
            "https://{regional}.api.riotgames.com/tft/match/v1/matches/by-puuid/{puuid}/ids?count={count}"
        );
        let resp = check(self.http.get(&url).await?, &url)?;
        resp.json()
    }

    /// Full match detail.
    pub async fn get_match(&self, platform_region: &str, match_id: &str) -> Result<MatchRecord> {
        let regional = regional_routing(platform_region);
        let url = format!("https://{regional}.api.riotgames.com/tft/match/v1/matches/{match_id}");
        let resp = check(self.http.get(&url).await?, &url)?;
        resp.json()
    }
}

fn check(resp: ApiResponse, url: &str) -> Result<ApiResponse> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(Error::UpstreamStatus {
            status: resp.status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riot::http_client::{HttpTransport, TransportError};
    use crate::riot::SlidingWindowLimiter;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct OneShot {
        status: u16,
        body: String,
        calls: AtomicU32,
    }

    #[async_trait]
    impl HttpTransport for OneShot {
        async fn get(&self, _url: &str) -> std::result::Result<ApiResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                headers: HashMap::new(),
                body: self.body.clone(),
            })
        }
    }

    fn client(status: u16, body: &str) -> (RiotClient, Arc<OneShot>) {
        let transport = Arc::new(OneShot {
            status,
            body: body.to_string(),
            calls: AtomicU32::new(0),
        });
        let limiter = Arc::new(SlidingWindowLimiter::new(100, 1000));
        (
            RiotClient::new(RiotHttpClient::new(transport.clone(), limiter)),
            transport,
        )
    }

    #[test]
    fn routing_table() {
        assert_eq!(regional_routing("na1"), "americas");
        assert_eq!(regional_routing("BR1"), "americas");
        assert_eq!(regional_routing("euw"), "europe");
        assert_eq!(regional_routing("tr1"), "europe");
        assert_eq!(regional_routing("kr"), "asia");
        assert_eq!(regional_routing("jp1"), "asia");
        // unrecognized regions default instead of failing
        assert_eq!(regional_routing("nowhere"), "asia");
    }

    #[tokio::test]
    async fn unsupported_tier_rejected_before_any_request() {
        let (client, transport) = client(200, "{}");
        let err = client.league_entries("kr", "iron").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedTier(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn league_entries_tagged_with_requested_tier() {
        let body = r#"{"entries":[{"summonerId":"S1","leaguePoints":900}]}"#;
        let (client, _) = client(200, body);
        let entries = client.league_entries("kr", "Challenger").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tier.as_deref(), Some("CHALLENGER"));
        assert_eq!(entries[0].league_points, 900);
    }

    #[tokio::test]
    async fn summoner_not_found_is_none() {
        let (client, _) = client(404, "");
        let result = client.summoner_by_id("kr", "S1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn summoner_error_status_propagates() {
        let (client, _) = client(500, "");
        let err = client.summoner_by_id("kr", "S1").await.unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn summoner_id_backfilled_when_payload_omits_it() {
        let (client, _) = client(200, r#"{"puuid":"P1"}"#);
        let record = client.summoner_by_id("kr", "S1").await.unwrap().unwrap();
        assert_eq!(record.id, "S1");
    }
}
