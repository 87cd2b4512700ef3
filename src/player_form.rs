use serde::{Deserialize, Serialize};

use crate::fixtures::{FixtureIndex, TeamDirectory};
use crate::fpl_api::{BootstrapTeam, Element, ElementSummary, HistoryEntry};
use crate::gameweek::GameweekWindow;
use crate::ownership::{OwnershipEntry, Percentage};
use crate::stats::{per90, serialize_2dp, serialize_3dp};

pub const DEFAULT_TOP_PLAYERS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    /// FPL `element_type`; anything outside 1..=4 (e.g. managers) is not a
    /// playing position.
    pub fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameweek {
    pub gameweek: u32,
    pub opponent: String,
    pub was_home: bool,
    #[serde(rename = "xGI", serialize_with = "serialize_2dp")]
    pub xgi: f64,
    #[serde(rename = "xG", serialize_with = "serialize_2dp")]
    pub xg: f64,
    #[serde(rename = "xA", serialize_with = "serialize_2dp")]
    pub xa: f64,
    #[serde(rename = "DC", serialize_with = "serialize_2dp")]
    pub dc: f64,
    pub goals: u32,
    pub assists: u32,
    pub minutes: u32,
    pub points: i32,
    pub is_blank: bool,
}

impl PlayerGameweek {
    fn empty(gameweek: u32, opponent: String, was_home: bool, is_blank: bool) -> Self {
        Self {
            gameweek,
            opponent,
            was_home,
            xgi: 0.0,
            xg: 0.0,
            xa: 0.0,
            dc: 0.0,
            goals: 0,
            assists: 0,
            minutes: 0,
            points: 0,
            is_blank,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerForm {
    pub id: u32,
    pub name: String,
    pub full_name: String,
    pub team: String,
    pub team_id: u32,
    pub team_code: u32,
    pub position: Position,
    pub price: f64,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub selected_by: f64,

    // Totals over the gameweek window.
    #[serde(rename = "xG", serialize_with = "serialize_2dp")]
    pub xg: f64,
    #[serde(rename = "xA", serialize_with = "serialize_2dp")]
    pub xa: f64,
    #[serde(rename = "xGI", serialize_with = "serialize_2dp")]
    pub xgi: f64,
    #[serde(rename = "DC", serialize_with = "serialize_2dp")]
    pub dc: f64,
    #[serde(rename = "xGIPer90", serialize_with = "serialize_3dp")]
    pub xgi_per90: f64,
    #[serde(rename = "dcPer90", serialize_with = "serialize_3dp")]
    pub dc_per90: f64,
    pub last6_matches: Vec<PlayerGameweek>,
    pub total_minutes: u32,

    // Season to date.
    #[serde(rename = "seasonXG", serialize_with = "serialize_2dp")]
    pub season_xg: f64,
    #[serde(rename = "seasonXA", serialize_with = "serialize_2dp")]
    pub season_xa: f64,
    pub season_goals: u32,
    pub season_assists: u32,
    pub season_minutes: u32,
    #[serde(rename = "seasonDC", serialize_with = "serialize_2dp")]
    pub season_dc: f64,
    pub total_points: i32,

    #[serde(default)]
    pub eo10k: Percentage,
    #[serde(default)]
    pub eo_overall: Percentage,
    #[serde(default)]
    pub cap10k: Percentage,
}

impl PlayerForm {
    pub fn apply_ownership(&mut self, entry: Option<&OwnershipEntry>) {
        let entry = entry.copied().unwrap_or_default();
        self.eo10k = entry.eo10k.unwrap_or(Percentage::ZERO);
        self.eo_overall = entry.eo_overall.unwrap_or(Percentage::ZERO);
        self.cap10k = entry.cap10k.unwrap_or(Percentage::ZERO);
    }
}

/// Highest season scorers first; ties keep bootstrap order. Non-playing
/// elements are skipped before the cut.
pub fn top_players(elements: &[Element], limit: usize) -> Vec<&Element> {
    let mut ranked: Vec<&Element> = elements
        .iter()
        .filter(|e| Position::from_element_type(e.element_type).is_some())
        .collect();
    ranked.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    ranked.truncate(limit);
    ranked
}

pub fn build_player_form(
    element: &Element,
    position: Position,
    team: &BootstrapTeam,
    summary: &ElementSummary,
    window: &GameweekWindow,
    index: &FixtureIndex<'_>,
    directory: &TeamDirectory<'_>,
) -> PlayerForm {
    let last6_matches: Vec<PlayerGameweek> = window
        .rounds
        .iter()
        .map(|&gw| player_gameweek(element.team, &summary.history, gw, index, directory))
        .collect();

    let total_minutes: u32 = last6_matches.iter().map(|m| m.minutes).sum();
    let xgi: f64 = last6_matches.iter().map(|m| m.xgi).sum();
    let xg: f64 = last6_matches.iter().map(|m| m.xg).sum();
    let xa: f64 = last6_matches.iter().map(|m| m.xa).sum();
    let dc: f64 = last6_matches.iter().map(|m| m.dc).sum();
    let season_dc: f64 = summary
        .history
        .iter()
        .map(|m| m.defensive_contribution)
        .sum();

    PlayerForm {
        id: element.id,
        name: element.web_name.clone(),
        full_name: format!("{} {}", element.first_name, element.second_name)
            .trim()
            .to_string(),
        team: team.short_name.clone(),
        team_id: team.id,
        team_code: team.code,
        position,
        price: f64::from(element.now_cost) / 10.0,
        yellow_cards: element.yellow_cards,
        red_cards: element.red_cards,
        selected_by: element.selected_by_percent,
        xg,
        xa,
        xgi,
        dc,
        xgi_per90: per90(xgi, total_minutes),
        dc_per90: per90(season_dc, element.minutes),
        last6_matches,
        total_minutes,
        season_xg: element.expected_goals,
        season_xa: element.expected_assists,
        season_goals: element.goals_scored,
        season_assists: element.assists,
        season_minutes: element.minutes,
        season_dc,
        total_points: element.total_points,
        eo10k: Percentage::ZERO,
        eo_overall: Percentage::ZERO,
        cap10k: Percentage::ZERO,
    }
}

/// A player's line for one gameweek. Blank only when the team had no finished
/// fixture; an unused squad member still gets a zero line against the
/// opponents their team faced.
pub fn player_gameweek(
    team_id: u32,
    history: &[HistoryEntry],
    gameweek: u32,
    index: &FixtureIndex<'_>,
    directory: &TeamDirectory<'_>,
) -> PlayerGameweek {
    let team_fixtures = index.for_team(gameweek, team_id);
    let matches: Vec<&HistoryEntry> = history.iter().filter(|m| m.round == gameweek).collect();

    let Some(first) = matches.first() else {
        let Some(first_fixture) = team_fixtures.first() else {
            return PlayerGameweek::empty(gameweek, "-".to_string(), true, true);
        };
        let opponent = team_fixtures
            .iter()
            .map(|f| directory.short_name(f.opponent_of(team_id)).unwrap_or("UNK"))
            .collect::<Vec<_>>()
            .join("/");
        return PlayerGameweek::empty(
            gameweek,
            opponent,
            first_fixture.team_h == team_id,
            false,
        );
    };

    let mut line = PlayerGameweek::empty(
        gameweek,
        String::new(),
        first.was_home,
        team_fixtures.is_empty(),
    );
    let mut opponents = Vec::with_capacity(matches.len());
    for entry in &matches {
        if let Some(short) = directory.short_name(entry.opponent_team) {
            opponents.push(short);
        }
        line.xgi += entry.expected_goal_involvements;
        line.xg += entry.expected_goals;
        line.xa += entry.expected_assists;
        line.dc += entry.defensive_contribution;
        line.goals += entry.goals_scored;
        line.assists += entry.assists;
        line.minutes += entry.minutes;
        line.points += entry.total_points;
    }
    line.opponent = opponents.join("/");
    line
}
