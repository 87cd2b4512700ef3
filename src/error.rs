use thiserror::Error;

/// A failed attempt to pull one upstream resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned http {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {cause}")]
    Transport { url: String, cause: String },

    #[error("invalid payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unusable payload from {url}: {cause}")]
    Parse { url: String, cause: String },

    #[error("relay {relay} failed: {source}")]
    Relay {
        relay: String,
        #[source]
        source: Box<FetchError>,
    },

    #[error("no relay endpoints configured")]
    NoRelays,
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Relay { source, .. } => source.status(),
            _ => None,
        }
    }
}
