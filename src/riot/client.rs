use std::time::Duration;

use reqwest::{Client, StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    config::{RiotConfig, UPSTREAM_TIMEOUT},
    error::UpstreamError,
    types::{
        ChampionMastery, KeyCheck, KeyHelp, LeagueEntry, RiotAccount, RiotMastery, RiotProfile,
        RiotRank, RiotSummoner,
    },
    utils,
};

use super::{
    FLEX_QUEUE, SOLO_QUEUE,
    ddragon::{self, DataDragon},
    opgg,
};

/// How often a 429 is retried before giving up.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 2;

const RIOT_TOKEN_HEADER: &str = "X-Riot-Token";
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Client for the Riot Games API plus its static-data and scraping helpers.
#[derive(Clone)]
pub struct RiotClient {
    http: Client,
    config: RiotConfig,
    ddragon: DataDragon,
}

impl RiotClient {
    pub fn new(http: Client, config: RiotConfig) -> Self {
        let ddragon = DataDragon::new(http.clone(), &config.ddragon_url);
        Self {
            http,
            config,
            ddragon,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Builds the full profile shown by the stats widget.
    ///
    /// Account, summoner and mastery failures fail the call. A failing
    /// ranked endpoint falls back to OP.GG, and a failing scrape leaves the
    /// rank unknown.
    pub async fn summoner_info(&self, game_name: &str, tag: &str) -> Result<RiotProfile, UpstreamError> {
        let account: RiotAccount = self
            .get_json(&self.config.account_url, &[
                "riot", "account", "v1", "accounts", "by-riot-id", game_name, tag,
            ])
            .await?;
        debug!(puuid = %account.puuid, "Resolved Riot account");

        let summoner: RiotSummoner = self
            .get_json(&self.config.platform_url, &[
                "lol", "summoner", "v4", "summoners", "by-puuid", account.puuid.as_str(),
            ])
            .await?;

        let rank = match self.ranked_entries(&account.puuid).await {
            Ok(entries) => select_rank(&entries),
            Err(e) => {
                warn!(error = %e, "Ranked lookup failed, falling back to OP.GG");
                opgg::scrape_rank(
                    &self.http,
                    &self.config.opgg_url,
                    &self.config.opgg_region,
                    game_name,
                    tag,
                )
                .await
            }
        };

        let masteries: Vec<ChampionMastery> = self
            .get_json_with_query(
                &self.config.platform_url,
                &[
                    "lol", "champion-mastery", "v4", "champion-masteries", "by-puuid",
                    account.puuid.as_str(), "top",
                ],
                &[("count", "1")],
            )
            .await?;

        let version = self.ddragon.latest_version().await;
        let top_mastery = match masteries.into_iter().next() {
            Some(mastery) => {
                let names = self.ddragon.champion_names(&version).await;
                Some(RiotMastery {
                    champion_id: mastery.champion_id.to_string(),
                    champion_name: ddragon::champion_name(&names, mastery.champion_id),
                    mastery_level: mastery.champion_level,
                    mastery_points: mastery.champion_points,
                })
            }
            None => None,
        };

        info!(riot_id = %format!("{}#{}", game_name, tag), "Fetched Riot profile");
        Ok(RiotProfile {
            region: self.config.region.clone(),
            riot_id: format!("{}#{}", game_name, tag),
            puuid: account.puuid,
            platform: self.config.platform.clone(),
            summoner_level: summoner.summoner_level,
            rank,
            icon: Some(self.ddragon.profile_icon_url(&version, summoner.profile_icon_id)),
            top_mastery,
        })
    }

    /// Probes the configured key against a cheap platform endpoint.
    pub async fn test_key(&self) -> KeyCheck {
        let Some(key) = self.config.api_key.as_deref() else {
            return KeyCheck {
                status: "error".to_string(),
                message: "RIOT_API_KEY not configured".to_string(),
                key_preview: None,
                details: None,
                help: Some(key_help(false)),
            };
        };

        let url = format!("{}/lol/platform/v3/champion-rotations", self.config.platform_url);
        debug!(%url, key = %utils::key_preview(key), "Testing Riot API key");

        let response = match self.http.get(&url).header(RIOT_TOKEN_HEADER, key).send().await {
            Ok(response) => response,
            Err(e) => {
                return KeyCheck {
                    status: "error".to_string(),
                    message: "Failed to test Riot API key".to_string(),
                    key_preview: None,
                    details: Some(UpstreamError::from_transport(e).to_string()),
                    help: None,
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return KeyCheck {
                status: "success".to_string(),
                message: "Riot API key is valid".to_string(),
                key_preview: Some(utils::key_preview(key)),
                details: None,
                help: None,
            };
        }

        let details = response.text().await.ok().filter(|body| !body.is_empty());
        if status == StatusCode::UNAUTHORIZED {
            KeyCheck {
                status: "error".to_string(),
                message: "Riot API key is unknown or invalid".to_string(),
                key_preview: None,
                details,
                help: Some(key_help(true)),
            }
        } else {
            KeyCheck {
                status: "error".to_string(),
                message: format!("Riot API key is invalid ({})", status.as_u16()),
                key_preview: None,
                details,
                help: None,
            }
        }
    }

    async fn ranked_entries(&self, puuid: &str) -> Result<Vec<LeagueEntry>, UpstreamError> {
        self.get_json(&self.config.platform_url, &[
            "lol", "league", "v4", "entries", "by-puuid", puuid,
        ])
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, base: &str, segments: &[&str]) -> Result<T, UpstreamError> {
        self.get_json_with_query(base, segments, &[]).await
    }

    /// GET against the Riot API with the key header.
    ///
    /// A 429 is retried up to [`MAX_RATE_LIMIT_RETRIES`] times, sleeping for
    /// the `Retry-After` seconds announced by the server.
    async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        base: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::Unauthorized("RIOT_API_KEY not configured".to_string()))?;
        let url = endpoint(base, segments, query)?;

        let mut retries = MAX_RATE_LIMIT_RETRIES;
        loop {
            let response = self
                .http
                .get(url.clone())
                .header(RIOT_TOKEN_HEADER, key)
                .send()
                .await
                .map_err(UpstreamError::from_transport)?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries == 0 {
                    return Err(UpstreamError::RateLimited);
                }
                let wait = retry_after(response.headers());
                warn!(?wait, retries, "Rate limited by Riot, retrying");
                tokio::time::sleep(wait).await;
                retries -= 1;
                continue;
            }

            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(UpstreamError::Unauthorized("Invalid Riot API key".to_string()))
                }
                StatusCode::NOT_FOUND => Err(UpstreamError::NotFound("Player not found".to_string())),
                s if !s.is_success() => Err(UpstreamError::Status {
                    status: s.as_u16(),
                    message: s.canonical_reason().unwrap_or("Unknown status").to_string(),
                }),
                _ => response
                    .json::<T>()
                    .await
                    .map_err(|e| UpstreamError::Parse(e.to_string())),
            };
        }
    }
}

/// Solo/Duo first, Flex otherwise.
pub fn select_rank(entries: &[LeagueEntry]) -> Option<RiotRank> {
    let entry = entries
        .iter()
        .find(|e| e.queue_type == SOLO_QUEUE)
        .or_else(|| entries.iter().find(|e| e.queue_type == FLEX_QUEUE))?;

    Some(RiotRank {
        tier: entry.tier.clone(),
        division: entry.rank.clone(),
        lp: entry.league_points,
        wins: entry.wins,
        losses: entry.losses,
        win_rate: utils::win_rate(entry.wins, entry.losses),
        queue: entry.queue_type.clone(),
        season: None,
    })
}

fn endpoint(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<url::Url, UpstreamError> {
    let mut url = url::Url::parse(base).map_err(|e| UpstreamError::Parse(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| UpstreamError::Parse(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Wait requested by a 429, never longer than [`UPSTREAM_TIMEOUT`].
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
        .min(UPSTREAM_TIMEOUT)
}

fn key_help(restart: bool) -> KeyHelp {
    let mut steps = vec![
        "1. Go to https://developer.riotgames.com/".to_string(),
        "2. Sign in with your Riot Games account".to_string(),
        "3. Go to \"Personal API Key\" section".to_string(),
        "4. Generate a new API key".to_string(),
        "5. Copy the key and add it to your .env file as RIOT_API_KEY=your_key_here".to_string(),
    ];
    if restart {
        steps.push("6. Restart the server".to_string());
    }
    KeyHelp { steps }
}
