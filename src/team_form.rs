use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fixtures::{FixtureIndex, TeamDirectory};
use crate::fpl_api::{BootstrapTeam, Element, LiveEvent};
use crate::gameweek::GameweekWindow;
use crate::stats::serialize_2dp;

/// Summed player `expected_goals` per (team, gameweek), built from the live
/// endpoint. FPL has no team-level xG, so this is the only source.
#[derive(Debug, Clone, Default)]
pub struct TeamXgTable {
    by_team_round: HashMap<(u32, u32), f64>,
}

impl TeamXgTable {
    pub fn accumulate<'a>(
        elements: &[Element],
        rounds: impl IntoIterator<Item = (u32, &'a LiveEvent)>,
    ) -> Self {
        let team_of: HashMap<u32, u32> = elements.iter().map(|e| (e.id, e.team)).collect();
        let mut table = Self::default();
        for (gameweek, live) in rounds {
            for element in &live.elements {
                let Some(&team_id) = team_of.get(&element.id) else {
                    continue;
                };
                table.add(team_id, gameweek, element.stats.expected_goals);
            }
        }
        table
    }

    pub fn add(&mut self, team_id: u32, gameweek: u32, xg: f64) {
        *self.by_team_round.entry((team_id, gameweek)).or_insert(0.0) += xg;
    }

    pub fn get(&self, team_id: u32, gameweek: u32) -> f64 {
        self.by_team_round
            .get(&(team_id, gameweek))
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureSplit {
    pub opponent_id: u32,
    pub is_home: bool,
    #[serde(serialize_with = "serialize_2dp")]
    pub xg: f64,
    #[serde(rename = "gc", serialize_with = "serialize_2dp")]
    pub xgc: f64,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGameweek {
    pub gameweek: u32,
    pub opponent: String,
    pub opponent_id: Option<u32>,
    pub is_home: bool,
    #[serde(serialize_with = "serialize_2dp")]
    pub xg: f64,
    #[serde(rename = "gc", serialize_with = "serialize_2dp")]
    pub xgc: f64,
    pub score: String,
    pub is_blank: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<FixtureSplit>,
}

impl TeamGameweek {
    pub fn blank(gameweek: u32) -> Self {
        Self {
            gameweek,
            opponent: "-".to_string(),
            opponent_id: None,
            is_home: true,
            xg: 0.0,
            xgc: 0.0,
            score: "-".to_string(),
            is_blank: true,
            splits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamForm {
    pub id: u32,
    pub code: u32,
    pub name: String,
    pub short_name: String,
    pub fixtures: Vec<TeamGameweek>,
    #[serde(rename = "totalXG", serialize_with = "serialize_2dp")]
    pub total_xg: f64,
    #[serde(rename = "avgXG", serialize_with = "serialize_2dp")]
    pub avg_xg: f64,
    #[serde(rename = "totalGC", serialize_with = "serialize_2dp")]
    pub total_xgc: f64,
    #[serde(rename = "avgGC", serialize_with = "serialize_2dp")]
    pub avg_xgc: f64,
}

pub fn aggregate_teams(
    teams: &[BootstrapTeam],
    window: &GameweekWindow,
    index: &FixtureIndex<'_>,
    xg: &TeamXgTable,
    directory: &TeamDirectory<'_>,
) -> Vec<TeamForm> {
    teams
        .iter()
        .map(|team| aggregate_team(team, window, index, xg, directory))
        .collect()
}

pub fn aggregate_team(
    team: &BootstrapTeam,
    window: &GameweekWindow,
    index: &FixtureIndex<'_>,
    xg: &TeamXgTable,
    directory: &TeamDirectory<'_>,
) -> TeamForm {
    let fixtures: Vec<TeamGameweek> = window
        .rounds
        .iter()
        .map(|&gw| team_gameweek(team.id, gw, index, xg, directory))
        .collect();

    let total_xg: f64 = fixtures.iter().map(|f| f.xg).sum();
    let total_xgc: f64 = fixtures.iter().map(|f| f.xgc).sum();
    let played = fixtures.iter().filter(|f| !f.is_blank).count();
    let (avg_xg, avg_xgc) = if played > 0 {
        (total_xg / played as f64, total_xgc / played as f64)
    } else {
        (0.0, 0.0)
    };

    TeamForm {
        id: team.id,
        code: team.code,
        name: team.name.clone(),
        short_name: team.short_name.clone(),
        fixtures,
        total_xg,
        avg_xg,
        total_xgc,
        avg_xgc,
    }
}

/// One team's record for one gameweek. The team's gameweek xG is split evenly
/// over its own fixtures; each opponent's xG is split over the opponent's
/// fixture count, which can differ in a double gameweek.
pub fn team_gameweek(
    team_id: u32,
    gameweek: u32,
    index: &FixtureIndex<'_>,
    xg: &TeamXgTable,
    directory: &TeamDirectory<'_>,
) -> TeamGameweek {
    let played = index.for_team(gameweek, team_id);
    let Some(first) = played.first() else {
        return TeamGameweek::blank(gameweek);
    };

    let team_xg = xg.get(team_id, gameweek);
    let mut splits = Vec::with_capacity(played.len());
    let mut opponents = Vec::with_capacity(played.len());
    for fixture in played {
        let opponent_id = fixture.opponent_of(team_id);
        if let Some(short) = directory.short_name(opponent_id) {
            opponents.push(short);
        }
        let opponent_games = index.count(gameweek, opponent_id).max(1);
        splits.push(FixtureSplit {
            opponent_id,
            is_home: fixture.team_h == team_id,
            xg: team_xg / played.len() as f64,
            xgc: xg.get(opponent_id, gameweek) / opponent_games as f64,
            score: fixture.score_for(team_id),
        });
    }

    TeamGameweek {
        gameweek,
        opponent: opponents.join("/"),
        opponent_id: Some(first.opponent_of(team_id)),
        is_home: first.team_h == team_id,
        xg: splits.iter().map(|s| s.xg).sum(),
        xgc: splits.iter().map(|s| s.xgc).sum(),
        score: splits
            .iter()
            .map(|s| s.score.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        is_blank: false,
        splits,
    }
}
