use tabled::Table;

use crate::{
    error,
    types::{RiotProfile, RiotTableRow},
};

pub async fn stats(game_name: String, tag: String) {
    match super::backend().riot_profile(&game_name, &tag).await {
        Ok(profile) => println!("{}", Table::new(profile_rows(&profile))),
        Err(e) => error!("Cannot load stats for {}#{}. Err: {}", game_name, tag, e),
    }
}

fn profile_rows(profile: &RiotProfile) -> Vec<RiotTableRow> {
    let row = |field: &str, value: String| RiotTableRow {
        field: field.to_string(),
        value,
    };

    let mut rows = vec![
        row("Riot ID", profile.riot_id.clone()),
        row("Region", format!("{} ({})", profile.region, profile.platform)),
        row("Level", profile.summoner_level.to_string()),
    ];

    match &profile.rank {
        Some(rank) => {
            rows.push(row(
                "Rank",
                format!("{} {} {} LP", rank.tier, rank.division, rank.lp),
            ));
            rows.push(row(
                "Record",
                format!("{}W {}L ({})", rank.wins, rank.losses, rank.win_rate),
            ));
        }
        None => rows.push(row("Rank", "Unranked".to_string())),
    }

    if let Some(mastery) = &profile.top_mastery {
        rows.push(row(
            "Top champion",
            format!(
                "{} (level {}, {} pts)",
                mastery.champion_name, mastery.mastery_level, mastery.mastery_points
            ),
        ));
    }

    if let Some(icon) = &profile.icon {
        rows.push(row("Icon", icon.clone()));
    }
    rows
}
