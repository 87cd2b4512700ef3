use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::fetcher::{Fetcher, Transport};
use crate::fpl_api::as_f64_any;
use crate::stats::round_dp;

pub const LIVEFPL_EO_URL: &str = "https://plan.livefpl.net/EO";

static EO_TOP_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\s+eo_t\s*=\s*(\{.*?\});").expect("valid eo_t pattern"));
static EO_OVERALL_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\s+eo_o\s*=\s*(\{.*?\});").expect("valid eo_o pattern"));
static PLAYER_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"player\?id=(\d+)").expect("valid player link pattern"));
static PERCENT_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d*)?)%$").expect("valid percent pattern"));

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("valid row selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("valid cell selector"));

// Positional columns of the EO table's percentage cells:
// EO (10k), Cap (10k), TC (10k), EO (overall), ...
const CAPTAINCY_COLUMN: usize = 1;
const OVERALL_EO_COLUMN: usize = 3;
const MIN_PERCENT_COLUMNS: usize = 4;

/// A percentage kept at one decimal place, serialized as e.g. `"12.3"`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);

    pub fn from_percent(value: f64) -> Self {
        if value.is_finite() {
            Self(round_dp(value, 1))
        } else {
            Self::ZERO
        }
    }

    pub fn from_fraction(value: f64) -> Self {
        Self::from_percent(value * 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }

    /// Keeps `current` if it carries a positive value, otherwise falls back to
    /// `candidate` (or whatever `current` was when there is no candidate).
    pub fn prefer(current: Option<Self>, candidate: Option<Self>) -> Option<Self> {
        match current {
            Some(value) if value.is_positive() => Some(value),
            _ => candidate.or(current),
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        as_f64_any(&value)
            .map(Percentage::from_percent)
            .ok_or_else(|| D::Error::custom(format!("invalid percentage: {value}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OwnershipEntry {
    pub eo10k: Option<Percentage>,
    pub eo_overall: Option<Percentage>,
    pub cap10k: Option<Percentage>,
}

/// Player id (as the page renders it) -> ownership figures.
pub type OwnershipMap = BTreeMap<String, OwnershipEntry>;

/// Downloads and parses the EO page. Ownership is an enrichment, so any
/// failure here yields an empty map.
pub fn fetch_ownership<T: Transport>(fetcher: &Fetcher<T>, url: &str) -> OwnershipMap {
    info!(url, "fetching ownership page");
    match fetcher.fetch_text(url) {
        Ok(html) => {
            let map = extract_ownership(&html);
            info!(players = map.len(), "ownership parsed");
            map
        }
        Err(err) => {
            warn!(error = %err, "ownership page unavailable, continuing without it");
            OwnershipMap::new()
        }
    }
}

pub fn extract_ownership(html: &str) -> OwnershipMap {
    let mut out = OwnershipMap::new();
    apply_script_vars(html, &mut out);
    apply_table_rows(html, &mut out);
    out
}

fn apply_script_vars(html: &str, out: &mut OwnershipMap) {
    if let Some(map) = script_object(&EO_TOP_VAR, html, "eo_t") {
        for (id, raw) in map {
            let Some(fraction) = as_f64_any(&raw) else {
                debug!(id = id.as_str(), "skipping non-numeric eo_t value");
                continue;
            };
            out.entry(id).or_default().eo10k = Some(Percentage::from_fraction(fraction));
        }
    }

    if let Some(map) = script_object(&EO_OVERALL_VAR, html, "eo_o") {
        for (id, raw) in map {
            let Some(fraction) = as_f64_any(&raw) else {
                debug!(id = id.as_str(), "skipping non-numeric eo_o value");
                continue;
            };
            if fraction <= 0.0 {
                continue;
            }
            out.entry(id).or_default().eo_overall = Some(Percentage::from_fraction(fraction));
        }
    }
}

fn script_object(pattern: &Regex, html: &str, name: &str) -> Option<Map<String, Value>> {
    let raw = pattern.captures(html)?.get(1)?.as_str();
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(map) => Some(map),
        Err(err) => {
            debug!(var = name, error = %err, "script variable is not a json object");
            None
        }
    }
}

fn apply_table_rows(html: &str, out: &mut OwnershipMap) {
    let document = Html::parse_document(html);
    for row in document.select(&ROW_SELECTOR) {
        let Some(id) = row_player_id(row) else {
            continue;
        };
        let entry = out.entry(id).or_default();

        let percents: Vec<f64> = row
            .select(&CELL_SELECTOR)
            .filter_map(|cell| percent_cell(&cell.text().collect::<String>()))
            .collect();
        if percents.len() < MIN_PERCENT_COLUMNS {
            continue;
        }

        let captaincy = Percentage::from_percent(percents[CAPTAINCY_COLUMN]);
        entry.cap10k = Percentage::prefer(entry.cap10k, Some(captaincy));

        let overall = Percentage::from_percent(percents[OVERALL_EO_COLUMN]);
        entry.eo_overall =
            Percentage::prefer(entry.eo_overall, Some(overall).filter(|p| p.is_positive()));
    }
}

fn row_player_id(row: ElementRef<'_>) -> Option<String> {
    row.select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| PLAYER_LINK.captures(href))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn percent_cell(text: &str) -> Option<f64> {
    let caps = PERCENT_CELL.captures(text.trim())?;
    caps.get(1)?.as_str().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use super::{
        CELL_SELECTOR, LINK_SELECTOR, OwnershipEntry, Percentage, ROW_SELECTOR,
        extract_ownership, percent_cell,
    };

    #[test]
    fn table_selectors_compile() {
        Lazy::force(&ROW_SELECTOR);
        Lazy::force(&LINK_SELECTOR);
        Lazy::force(&CELL_SELECTOR);
    }

    #[test]
    fn table_fallback_reads_linked_rows() {
        let html = r#"<table><tr><td><a href="/player?id=7">X</a></td><td>10%</td><td>20%</td><td>1%</td><td>30%</td></tr></table>"#;
        let first = extract_ownership(html);
        let entry = first.get("7").expect("linked row parsed");
        assert_eq!(entry.cap10k, Some(Percentage::from_percent(20.0)));
        assert_eq!(entry.eo_overall, Some(Percentage::from_percent(30.0)));
        assert_eq!(extract_ownership(html), first);
    }

    #[test]
    fn percentage_renders_one_decimal() {
        assert_eq!(Percentage::from_fraction(0.4567).to_string(), "45.7");
        assert_eq!(Percentage::from_percent(3.0).to_string(), "3.0");
        assert_eq!(Percentage::ZERO.to_string(), "0.0");
    }

    #[test]
    fn prefer_keeps_positive_current() {
        let current = Some(Percentage::from_percent(12.0));
        let candidate = Some(Percentage::from_percent(50.0));
        assert_eq!(Percentage::prefer(current, candidate), current);
        assert_eq!(
            Percentage::prefer(Some(Percentage::ZERO), candidate),
            candidate
        );
        assert_eq!(Percentage::prefer(None, candidate), candidate);
        assert_eq!(
            Percentage::prefer(Some(Percentage::ZERO), None),
            Some(Percentage::ZERO)
        );
    }

    #[test]
    fn script_vars_scale_fractions() {
        let html = r#"<script>var eo_t = {"1": 0.5234, "2": "0.1"}; var eo_o = {"1": 0.2, "2": 0};</script>"#;
        let map = extract_ownership(html);
        assert_eq!(
            map.get("1"),
            Some(&OwnershipEntry {
                eo10k: Some(Percentage::from_percent(52.3)),
                eo_overall: Some(Percentage::from_percent(20.0)),
                cap10k: None,
            })
        );
        let second = map.get("2").expect("id 2 present");
        assert_eq!(second.eo10k, Some(Percentage::from_percent(10.0)));
        assert_eq!(second.eo_overall, None);
    }

    #[test]
    fn malformed_script_var_is_skipped() {
        let html = r#"<script>var eo_t = {"1": 0.5,}; var eo_o = {"1": 0.25};</script>"#;
        let map = extract_ownership(html);
        let entry = map.get("1").expect("id 1 from eo_o");
        assert_eq!(entry.eo10k, None);
        assert_eq!(entry.eo_overall, Some(Percentage::from_percent(25.0)));
    }

    #[test]
    fn percent_cell_requires_whole_cell() {
        assert_eq!(percent_cell(" 75.51% "), Some(75.51));
        assert_eq!(percent_cell("12%"), Some(12.0));
        assert_eq!(percent_cell("up 12%"), None);
        assert_eq!(percent_cell("12.5"), None);
    }
}
