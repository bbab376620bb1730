pub mod app;
pub mod archive;
pub mod config;
pub mod constants;
pub mod dates;
pub mod dedup;
pub mod error;
pub mod infra;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub mod types;

pub use error::{Result, ScraperError, StoreError};
pub use pipeline::Pipeline;
pub use types::{EventRecord, RunSummary};
