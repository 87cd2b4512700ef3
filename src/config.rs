use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::{DEFAULT_ATTEMPTS, DEFAULT_RELAYS, FetchMode, FetcherConfig};
use crate::fpl_api::FPL_API_BASE;
use crate::gameweek::DEFAULT_WINDOW_SIZE;
use crate::ownership::LIVEFPL_EO_URL;
use crate::player_form::DEFAULT_TOP_PLAYERS;
use crate::snapshot::DEFAULT_SNAPSHOT_PATH;

const DEFAULT_BACKOFF_MS: u64 = 1000;
const DEFAULT_PARALLELISM: usize = 6;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_BATCH_PAUSE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub api_base: String,
    pub ownership_url: String,
    pub output_path: PathBuf,
    pub fetch: FetcherConfig,
    pub request_timeout: Duration,
    pub parallelism: usize,
    pub window_size: u32,
    pub top_players: usize,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            api_base: FPL_API_BASE.to_string(),
            ownership_url: LIVEFPL_EO_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            fetch: FetcherConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            parallelism: DEFAULT_PARALLELISM,
            window_size: DEFAULT_WINDOW_SIZE,
            top_players: DEFAULT_TOP_PLAYERS,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
        }
    }
}

impl SnapshotConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key -> value source. Blank or unparsable
    /// values fall back to defaults; numbers are clamped to sane ranges.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let api_base = string("FPL_API_BASE").unwrap_or_else(|| FPL_API_BASE.to_string());
        let ownership_url = string("EO_PAGE_URL").unwrap_or_else(|| LIVEFPL_EO_URL.to_string());
        let output_path = string("SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));

        let mode = string("FETCH_MODE")
            .and_then(|raw| FetchMode::parse(&raw))
            .unwrap_or(FetchMode::Retry);
        let attempts = parse_or(string("FETCH_ATTEMPTS"), DEFAULT_ATTEMPTS).clamp(1, 10);
        let backoff_ms = parse_or(string("FETCH_BACKOFF_MS"), DEFAULT_BACKOFF_MS).min(60_000);
        let relays = string("FETCH_RELAYS")
            .map(|raw| parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect());

        Self {
            api_base,
            ownership_url,
            output_path,
            fetch: FetcherConfig {
                mode,
                attempts,
                backoff: Duration::from_millis(backoff_ms),
                relays,
            },
            request_timeout: Duration::from_secs(
                parse_or(string("REQUEST_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS).clamp(1, 300),
            ),
            parallelism: parse_or(string("FETCH_PARALLELISM"), DEFAULT_PARALLELISM).clamp(1, 32),
            window_size: parse_or(string("WINDOW_SIZE"), DEFAULT_WINDOW_SIZE).clamp(1, 38),
            top_players: parse_or(string("TOP_PLAYERS"), DEFAULT_TOP_PLAYERS).clamp(1, 1000),
            batch_size: parse_or(string("PLAYER_BATCH_SIZE"), DEFAULT_BATCH_SIZE).clamp(1, 500),
            batch_pause: Duration::from_millis(
                parse_or(string("PLAYER_BATCH_PAUSE_MS"), DEFAULT_BATCH_PAUSE_MS).min(60_000),
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', ' '])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
