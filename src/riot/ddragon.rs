use std::collections::HashMap;

use reqwest::Client;
use tracing::warn;

use crate::types::DataDragonChampions;

/// Used whenever the version list cannot be fetched.
pub const FALLBACK_VERSION: &str = "13.24.1";

/// Static game data from Data Dragon. Every lookup degrades instead of failing.
#[derive(Clone)]
pub struct DataDragon {
    http: Client,
    base_url: String,
}

impl DataDragon {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Latest published version, or [`FALLBACK_VERSION`].
    pub async fn latest_version(&self) -> String {
        let url = format!("{}/api/versions.json", self.base_url);
        let versions = match self.http.get(&url).send().await {
            Ok(response) => response.json::<Vec<String>>().await,
            Err(e) => Err(e),
        };

        match versions {
            Ok(versions) => versions
                .into_iter()
                .next()
                .unwrap_or_else(|| FALLBACK_VERSION.to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to fetch Data Dragon version, using fallback");
                FALLBACK_VERSION.to_string()
            }
        }
    }

    /// Champion names keyed by numeric champion id. Empty on failure.
    pub async fn champion_names(&self, version: &str) -> HashMap<String, String> {
        let url = format!("{}/cdn/{}/data/en_US/champion.json", self.base_url, version);
        let champions = match self.http.get(&url).send().await {
            Ok(response) => response.json::<DataDragonChampions>().await,
            Err(e) => Err(e),
        };

        match champions {
            Ok(champions) => champions
                .data
                .into_values()
                .map(|champion| (champion.key, champion.name))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch champion data");
                HashMap::new()
            }
        }
    }

    pub fn profile_icon_url(&self, version: &str, icon_id: u64) -> String {
        format!("{}/cdn/{}/img/profileicon/{}.png", self.base_url, version, icon_id)
    }
}

/// Display name for a champion id, `"Champion <id>"` when unknown.
pub fn champion_name(names: &HashMap<String, String>, champion_id: u64) -> String {
    names
        .get(&champion_id.to_string())
        .cloned()
        .unwrap_or_else(|| format!("Champion {}", champion_id))
}
