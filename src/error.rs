use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Listing page could not be retrieved (network, timeout, bad status, empty body).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Listing page was retrieved but no event card could be parsed from it.
    #[error("no events found: {0}")]
    Extraction(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("a scrape run is already in progress")]
    AlreadyRunning,

    /// Terminal failure of a pipeline run, wrapping the hard error that aborted it.
    #[error("scrape run failed: {0}")]
    RunFailed(String),
}

impl ScraperError {
    pub fn run_failed(cause: &ScraperError) -> Self {
        ScraperError::RunFailed(cause.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A create-only batch hit an id that is already stored; nothing was written.
    #[error("document '{id}' already exists in '{collection}'")]
    Conflict { collection: String, id: String },

    #[error("{0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
