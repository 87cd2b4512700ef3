use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const FPL_API_BASE: &str = "https://fantasy.premierleague.com/api";

pub fn bootstrap_url(base: &str) -> String {
    format!("{}/bootstrap-static/", base.trim_end_matches('/'))
}

pub fn fixtures_url(base: &str) -> String {
    format!("{}/fixtures/", base.trim_end_matches('/'))
}

pub fn live_url(base: &str, gameweek: u32) -> String {
    format!("{}/event/{gameweek}/live/", base.trim_end_matches('/'))
}

pub fn element_summary_url(base: &str, element_id: u32) -> String {
    format!("{}/element-summary/{element_id}/", base.trim_end_matches('/'))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bootstrap {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub events: Vec<Event>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub teams: Vec<BootstrapTeam>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: u32,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub is_current: bool,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub finished: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapTeam {
    pub id: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub code: u32,
    #[serde(default, deserialize_with = "string_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    pub id: u32,
    #[serde(default, deserialize_with = "string_or_default")]
    pub web_name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub second_name: String,
    pub team: u32,
    #[serde(default)]
    pub element_type: u8,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub now_cost: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub yellow_cards: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub red_cards: u32,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub selected_by_percent: f64,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub total_points: i32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub minutes: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub goals_scored: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub assists: u32,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_goals: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_assists: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub id: u32,
    /// `None` for fixtures not yet assigned to a gameweek.
    #[serde(default)]
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default)]
    pub team_h_score: Option<u32>,
    #[serde(default)]
    pub team_a_score: Option<u32>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub finished: bool,
}

impl Fixture {
    pub fn opponent_of(&self, team_id: u32) -> u32 {
        if self.team_h == team_id {
            self.team_a
        } else {
            self.team_h
        }
    }

    /// Score as seen from `team_id`, missing scores count as zero.
    pub fn score_for(&self, team_id: u32) -> String {
        let home = self.team_h_score.unwrap_or(0);
        let away = self.team_a_score.unwrap_or(0);
        if self.team_h == team_id {
            format!("{home}-{away}")
        } else {
            format!("{away}-{home}")
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveEvent {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub elements: Vec<LiveElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveElement {
    pub id: u32,
    #[serde(default)]
    pub stats: LiveStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStats {
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_goals: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementSummary {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    #[serde(default)]
    pub opponent_team: u32,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub was_home: bool,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_goal_involvements: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_goals: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub expected_assists: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub defensive_contribution: f64,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub goals_scored: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub assists: u32,
    #[serde(default, deserialize_with = "u32_or_zero")]
    pub minutes: u32,
    #[serde(default, deserialize_with = "i32_or_zero")]
    pub total_points: i32,
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow::anyhow!("empty bootstrap response"));
    }
    serde_json::from_str(trimmed).context("invalid bootstrap json")
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid fixtures json")
}

pub fn parse_live_json(raw: &str) -> Result<LiveEvent> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(LiveEvent::default());
    }
    serde_json::from_str(trimmed).context("invalid live json")
}

pub fn parse_element_summary_json(raw: &str) -> Result<ElementSummary> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ElementSummary::default());
    }
    serde_json::from_str(trimmed).context("invalid element summary json")
}

fn vec_or_default<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn string_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let rendered = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(rendered)
}

fn bool_or_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<bool>::deserialize(deserializer)?;
    Ok(value.unwrap_or(false))
}

// FPL ships most decimal stats as strings ("0.45"), counts as integers.
fn f64_or_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64_any(&value).unwrap_or(0.0))
}

fn u32_or_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = as_f64_any(&value).unwrap_or(0.0);
    if n.is_finite() && n > 0.0 {
        Ok(n.round().min(u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

fn i32_or_zero<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = as_f64_any(&value).unwrap_or(0.0);
    if n.is_finite() {
        Ok(n.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    } else {
        Ok(0)
    }
}

pub(crate) fn as_f64_any(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{element_summary_url, live_url, parse_bootstrap_json, parse_element_summary_json};

    #[test]
    fn urls_tolerate_trailing_slash() {
        assert_eq!(
            live_url("https://fpl.test/api/", 7),
            "https://fpl.test/api/event/7/live/"
        );
        assert_eq!(
            element_summary_url("https://fpl.test/api", 42),
            "https://fpl.test/api/element-summary/42/"
        );
    }

    #[test]
    fn element_stats_accept_strings_and_nulls() {
        let raw = r#"{
            "events": [{"id": 1, "is_current": null, "finished": true}],
            "teams": [{"id": 1, "code": 3, "name": "Arsenal", "short_name": "ARS"}],
            "elements": [{
                "id": 10, "web_name": "Saka", "team": 1, "element_type": 3,
                "now_cost": 101, "selected_by_percent": "34.5", "total_points": "120",
                "expected_goals": "7.81", "expected_assists": null, "minutes": 1800
            }]
        }"#;
        let bootstrap = parse_bootstrap_json(raw).expect("bootstrap should parse");
        let saka = &bootstrap.elements[0];
        assert_eq!(saka.total_points, 120);
        assert!((saka.selected_by_percent - 34.5).abs() < 1e-9);
        assert!((saka.expected_goals - 7.81).abs() < 1e-9);
        assert_eq!(saka.expected_assists, 0.0);
        assert!(!bootstrap.events[0].is_current);
        assert!(bootstrap.events[0].finished);
    }

    #[test]
    fn null_summary_is_empty() {
        let summary = parse_element_summary_json("null").expect("null should parse");
        assert!(summary.history.is_empty());
    }

    #[test]
    fn empty_bootstrap_is_an_error() {
        assert!(parse_bootstrap_json("  ").is_err());
    }
}
