//! Rank fallback scraped from the public OP.GG summoner page.
//!
//! Only used when the ranked endpoint of the Riot API fails. The page layout
//! is not under our control: anything that does not match yields `None` and
//! the profile is served with an unknown rank.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::{types::RiotRank, utils};

use super::SOLO_QUEUE;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

const SOLO_QUEUE_LABELS: &[&str] = &["Classé en solo/duo", "Ranked Solo/Duo", "Ranked Solo"];

/// Fetches and parses the solo queue rank for `game_name#tag`.
pub async fn scrape_rank(
    http: &Client,
    base_url: &str,
    region: &str,
    game_name: &str,
    tag: &str,
) -> Option<RiotRank> {
    let slug = format!("{}-{}", game_name, tag);
    let mut url = url::Url::parse(base_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["fr", "lol", "summoners", region, slug.as_str()]);

    debug!(%url, "Scraping OP.GG rank");
    let response = match http
        .get(url.clone())
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, error = %e, "OP.GG request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        warn!(%url, status = %response.status(), "OP.GG answered with an error");
        return None;
    }

    let html = response.text().await.ok()?;
    let rank = parse_rank(&html);
    if rank.is_none() {
        warn!(%url, "No solo queue rank found on OP.GG page");
    }
    rank
}

/// Extracts the solo queue rank from a summoner page.
///
/// Looks for the ranked solo section first and falls back to the season
/// history table, taking its most recent row.
pub fn parse_rank(html: &str) -> Option<RiotRank> {
    let document = Html::parse_document(html);
    solo_queue_section(&document).or_else(|| season_table(&document))
}

fn solo_queue_section(document: &Html) -> Option<RiotRank> {
    let sections = Selector::parse("section").ok()?;
    let strong = Selector::parse("strong").ok()?;
    let span = Selector::parse("span").ok()?;

    // innermost section carrying the label
    let (section, text) = document
        .select(&sections)
        .map(|s| (s, text_of(&s)))
        .filter(|(_, text)| SOLO_QUEUE_LABELS.iter().any(|label| text.contains(label)))
        .min_by_key(|(_, text)| text.len())?;

    let tier_text = section
        .select(&strong)
        .map(|e| text_of(&e))
        .find(|t| !t.is_empty())?;
    if tier_text.eq_ignore_ascii_case("unranked") {
        return None;
    }

    let lp = section
        .select(&span)
        .find_map(|e| parse_lp(&text_of(&e)))
        .unwrap_or(0);
    let (wins, losses) = parse_record(&text).unwrap_or((0, 0));
    let (tier, division) = split_tier(&tier_text);

    Some(RiotRank {
        tier,
        division,
        lp,
        wins,
        losses,
        win_rate: utils::win_rate(wins, losses),
        queue: SOLO_QUEUE.to_string(),
        season: None,
    })
}

fn season_table(document: &Html) -> Option<RiotRank> {
    let rows = Selector::parse("table tbody tr").ok()?;
    let cells = Selector::parse("td").ok()?;

    document.select(&rows).find_map(|row| {
        let cells: Vec<String> = row.select(&cells).map(|c| text_of(&c)).collect();
        let [season, tier_text, lp, ..] = cells.as_slice() else {
            return None;
        };

        let mut chars = season.chars();
        let is_season = chars.next() == Some('S') && chars.next().is_some_and(|c| c.is_ascii_digit());
        if !is_season || tier_text.is_empty() || tier_text.eq_ignore_ascii_case("unranked") {
            return None;
        }

        let (tier, division) = split_tier(tier_text);
        Some(RiotRank {
            tier,
            division,
            lp: parse_lp(lp).or_else(|| lp.trim().parse().ok()).unwrap_or(0),
            wins: 0,
            losses: 0,
            win_rate: utils::win_rate(0, 0),
            queue: SOLO_QUEUE.to_string(),
            season: Some(season.clone()),
        })
    })
}

fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"1,024 LP"` -> `1024`.
fn parse_lp(text: &str) -> Option<u32> {
    let idx = text.find("LP")?;
    let digits: String = text[..idx]
        .trim_end()
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// Finds a `12V 10D` (or `12W 10L`) pair in free text.
fn parse_record(text: &str) -> Option<(u32, u32)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let wins = counted(pair[0], &['V', 'W'])?;
        let losses = counted(pair[1], &['D', 'L'])?;
        Some((wins, losses))
    })
}

fn counted(token: &str, suffixes: &[char]) -> Option<u32> {
    let last = token.chars().last()?;
    if !suffixes.contains(&last) {
        return None;
    }
    token[..token.len() - last.len_utf8()].parse().ok()
}

/// `"emerald 2"` -> `("EMERALD", "II")`, `"Master"` -> `("MASTER", "")`.
fn split_tier(text: &str) -> (String, String) {
    let mut parts = text.split_whitespace();
    let tier = parts.next().unwrap_or_default().to_uppercase();
    let division = match parts.next() {
        Some("1") => "I".to_string(),
        Some("2") => "II".to_string(),
        Some("3") => "III".to_string(),
        Some("4") => "IV".to_string(),
        Some(other) => other.to_uppercase(),
        None => String::new(),
    };
    (tier, division)
}
