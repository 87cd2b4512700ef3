#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use fpl_snapshot::config::SnapshotConfig;
use fpl_snapshot::error::FetchError;
use fpl_snapshot::fetcher::{FetchMode, FetcherConfig, HttpResponse, Transport};

pub const API_BASE: &str = "https://fpl.test/api";
pub const EO_URL: &str = "https://eo.test/EO";

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Canned responses per url. A route scripted with several responses serves
/// them in order and then keeps repeating the last one. Unrouted urls fail
/// as a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.route_sequence(url, vec![(status, body.into())])
    }

    pub fn route_sequence(self, url: &str, responses: Vec<(u16, String)>) -> Self {
        let queue = responses
            .into_iter()
            .map(|(status, body)| HttpResponse { status, body })
            .collect();
        self.routes
            .lock()
            .expect("routes lock")
            .insert(url.to_string(), queue);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().expect("hits lock").values().sum()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        *self
            .hits
            .lock()
            .expect("hits lock")
            .entry(url.to_string())
            .or_insert(0) += 1;

        let mut routes = self.routes.lock().expect("routes lock");
        let Some(queue) = routes.get_mut(url) else {
            return Err(FetchError::Transport {
                url: url.to_string(),
                cause: "connection refused".to_string(),
            });
        };
        let resp = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        resp.ok_or_else(|| FetchError::Transport {
            url: url.to_string(),
            cause: "no scripted response".to_string(),
        })
    }
}

pub fn retry_config(attempts: u32) -> FetcherConfig {
    FetcherConfig {
        mode: FetchMode::Retry,
        attempts,
        backoff: Duration::ZERO,
        relays: Vec::new(),
    }
}

pub fn test_config(output_path: PathBuf) -> SnapshotConfig {
    SnapshotConfig {
        api_base: API_BASE.to_string(),
        ownership_url: EO_URL.to_string(),
        output_path,
        fetch: retry_config(3),
        parallelism: 2,
        batch_size: 2,
        batch_pause: Duration::ZERO,
        ..SnapshotConfig::default()
    }
}

/// Every upstream the pipeline touches, answered from `tests/fixtures`.
/// Gameweek 3's live stats fail; the ownership page only knows player 12.
pub fn fpl_season() -> ScriptedTransport {
    let mut transport = ScriptedTransport::new()
        .route(
            &format!("{API_BASE}/bootstrap-static/"),
            200,
            read_fixture("bootstrap.json"),
        )
        .route(
            &format!("{API_BASE}/fixtures/"),
            200,
            read_fixture("fixtures.json"),
        )
        .route(
            &format!("{API_BASE}/event/1/live/"),
            200,
            read_fixture("live_gw1.json"),
        )
        .route(
            &format!("{API_BASE}/event/2/live/"),
            200,
            read_fixture("live_gw2.json"),
        )
        .route(&format!("{API_BASE}/event/3/live/"), 500, "upstream error")
        .route(
            EO_URL,
            200,
            r#"<html><script>var eo_t = {"12": 0.655, "21": 1.2043};</script></html>"#,
        );
    for id in [11, 12, 21, 22] {
        transport = transport.route(
            &format!("{API_BASE}/element-summary/{id}/"),
            200,
            read_fixture(&format!("element_summary_{id}.json")),
        );
    }
    transport
}
