//! Crawler module for bounded-concurrency recursive downloads
//!
//! This module contains the core crawling logic, including:
//! - The task scheduler that caps how many operations run at once
//! - Join counters that aggregate subtree completion
//! - HTTP fetching and HTML link extraction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod join;
mod parser;
mod scheduler;

pub use coordinator::Crawler;
pub use fetcher::{build_http_client, user_agent, Fetcher, HttpFetcher};
pub use join::{JoinCounter, JoinToken};
pub use parser::{parse_links, HtmlLinkExtractor, LinkExtractor};
pub use scheduler::{
    map_bounded, SchedulerObserver, SchedulerStats, TaskFuture, TaskHandle, TaskId, TaskScheduler,
    TracingObserver,
};
