use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::FetchError;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_RELAYS: &[&str] = &[
    "https://corsproxy.io/?",
    "https://api.allorigins.win/raw?url=",
    "https://api.codetabs.com/v1/proxy?quest=",
];

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One GET against the network. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

impl Transport for Client {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = self
            .request(Method::GET, url)
            .send()
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                cause: err.to_string(),
            })?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|err| FetchError::Transport {
            url: url.to_string(),
            cause: format!("failed reading body: {err}"),
        })?;
        Ok(HttpResponse { status, body })
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        (**self).get(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Single attempt, no recovery.
    Direct,
    /// Repeated attempts against the target with a fixed pause in between.
    Retry,
    /// Each relay wraps the target; first relay to answer wins.
    RelayChain,
}

impl FetchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(FetchMode::Direct),
            "retry" => Some(FetchMode::Retry),
            "relay" | "relays" | "proxy" => Some(FetchMode::RelayChain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub mode: FetchMode,
    pub attempts: u32,
    pub backoff: Duration,
    pub relays: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Retry,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            relays: DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

pub struct Fetcher<T> {
    transport: T,
    config: FetcherConfig,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, config: FetcherConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn fetch_json<D: DeserializeOwned>(&self, url: &str) -> Result<D, FetchError> {
        self.dispatch(url, &decode_json::<D>)
    }

    /// Decodes the body with `parse`. A parse failure counts as a failed
    /// attempt, same as an undecodable body in `fetch_json`.
    pub fn fetch_with<O>(
        &self,
        url: &str,
        parse: impl Fn(&str) -> anyhow::Result<O>,
    ) -> Result<O, FetchError> {
        self.dispatch(url, &|url, body| {
            parse(&body).map_err(|err| FetchError::Parse {
                url: url.to_string(),
                cause: format!("{err:#}"),
            })
        })
    }

    pub fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.dispatch(url, &|_, body| Ok(body))
    }

    fn dispatch<O>(
        &self,
        url: &str,
        decode: &dyn Fn(&str, String) -> Result<O, FetchError>,
    ) -> Result<O, FetchError> {
        match self.config.mode {
            FetchMode::Direct => self.attempt(url, decode),
            FetchMode::Retry => self.with_retry(url, decode),
            FetchMode::RelayChain => self.via_relays(url, decode),
        }
    }

    fn attempt<O>(
        &self,
        url: &str,
        decode: &dyn Fn(&str, String) -> Result<O, FetchError>,
    ) -> Result<O, FetchError> {
        let resp = self.transport.get(url)?;
        if !resp.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }
        decode(url, resp.body)
    }

    fn with_retry<O>(
        &self,
        url: &str,
        decode: &dyn Fn(&str, String) -> Result<O, FetchError>,
    ) -> Result<O, FetchError> {
        let attempts = self.config.attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(url, attempt, "fetching");
            match self.attempt(url, decode) {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    warn!(url, attempt, attempts, error = %err, "fetch attempt failed");
                    if !self.config.backoff.is_zero() {
                        thread::sleep(self.config.backoff);
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn via_relays<O>(
        &self,
        url: &str,
        decode: &dyn Fn(&str, String) -> Result<O, FetchError>,
    ) -> Result<O, FetchError> {
        let mut last_err = None;
        for relay in &self.config.relays {
            let relayed = relay_url(relay, url);
            match self.attempt(&relayed, decode) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(relay = relay.as_str(), error = %err, "relay failed");
                    last_err = Some(FetchError::Relay {
                        relay: relay.clone(),
                        source: Box::new(err),
                    });
                }
            }
        }
        Err(last_err.unwrap_or(FetchError::NoRelays))
    }
}

/// Wraps `target` in a relay template. `{url}` marks the insertion point,
/// otherwise the encoded target is appended.
pub fn relay_url(template: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    if template.contains("{url}") {
        template.replace("{url}", &encoded)
    } else {
        format!("{template}{encoded}")
    }
}

fn decode_json<D: DeserializeOwned>(url: &str, body: String) -> Result<D, FetchError> {
    serde_json::from_str(body.trim()).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
