//! Sumi-Spider: a bounded-concurrency recursive web spider
//!
//! This crate implements a small worker-pool scheduler that caps how many
//! asynchronous operations run at once, and a cycle-safe recursive crawler
//! built on top of it that downloads a link graph to a content store.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Crawl setup failed: {0}")]
    Setup(String),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Spider operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, TaskScheduler};
pub use output::CrawlReport;
pub use state::{NodeState, VisitedRegistry};
pub use storage::ContentStore;
pub use url::{normalize_url, storage_key};
