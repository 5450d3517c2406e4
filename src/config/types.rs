use serde::Deserialize;

/// Main configuration structure for Sumi-Spider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of link levels to download, counting the root as level one
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of crawl tasks running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Which content store backs the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One file per document under the download directory
    #[default]
    Files,
    /// A single SQLite database file
    Sqlite,
    /// Process memory only; nothing survives the run
    Memory,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory for the file backend
    #[serde(rename = "download-dir", default = "default_download_dir")]
    pub download_dir: String,

    /// Path to the SQLite database file for the sqlite backend
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Extension applied to documents whose URL path has none
    #[serde(rename = "default-extension", default = "default_extension")]
    pub default_extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            download_dir: default_download_dir(),
            database_path: default_database_path(),
            default_extension: default_extension(),
        }
    }
}

fn default_max_depth() -> u32 {
    1
}

fn default_concurrency() -> usize {
    2
}

fn default_crawler_name() -> String {
    "sumi-spider".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

fn default_database_path() -> String {
    "spider.db".to_string()
}

fn default_extension() -> String {
    "html".to_string()
}
