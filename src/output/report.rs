//! Crawl report collected while a traversal runs
//!
//! This module provides the per-crawl tallies shown to the user at the end of
//! a run: how many nodes were visited, fetched, or served from the store, and
//! which nodes failed with what error.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A node whose processing failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    /// Canonical URL of the node
    pub url: String,

    /// Remaining depth the node was visited with
    pub depth: u32,

    /// Error description
    pub error: String,
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Canonical root URL
    pub root: String,

    /// Requested maximum depth
    pub max_depth: u32,

    /// Concurrency limit the crawl ran with
    pub concurrency: usize,

    /// Nodes claimed in the visited registry
    pub visited: usize,

    /// Nodes downloaded over the network and saved
    pub fetched: usize,

    /// Nodes served from the content store
    pub cache_hits: usize,

    /// Submissions skipped because the URL was already claimed
    pub duplicates: usize,

    /// Links extracted across all nodes
    pub links_discovered: usize,

    /// Nodes that failed, in the order they failed
    pub failures: Vec<NodeFailure>,

    /// When the crawl started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn new(root: impl Into<String>, max_depth: u32, concurrency: usize) -> Self {
        Self {
            root: root.into(),
            max_depth,
            concurrency,
            visited: 0,
            fetched: 0,
            cache_hits: 0,
            duplicates: 0,
            links_discovered: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Number of visited nodes that did not fail
    pub fn succeeded(&self) -> usize {
        self.visited.saturating_sub(self.failures.len())
    }

    /// Returns true if no node failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Percentage of visited nodes that did not fail
    pub fn success_rate(&self) -> f64 {
        if self.visited == 0 {
            return 100.0;
        }
        (self.succeeded() as f64 / self.visited as f64) * 100.0
    }

    pub(crate) fn record_failure(&mut self, url: &str, depth: u32, error: &str) {
        self.failures.push(NodeFailure {
            url: url.to_string(),
            depth,
            error: error.to_string(),
        });
    }
}

/// Formats a report as plain text
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Report ===\n\n");
    out.push_str(&format!("Root: {}\n", report.root));
    out.push_str(&format!(
        "Max depth: {}  Concurrency: {}\n",
        report.max_depth, report.concurrency
    ));
    out.push_str(&format!("Started: {}\n", report.started_at.to_rfc3339()));
    out.push_str(&format!("Elapsed: {:.2}s\n\n", report.elapsed.as_secs_f64()));

    out.push_str("Nodes:\n");
    out.push_str(&format!("  Visited: {}\n", report.visited));
    out.push_str(&format!("  Fetched: {}\n", report.fetched));
    out.push_str(&format!("  Cache hits: {}\n", report.cache_hits));
    out.push_str(&format!("  Duplicates skipped: {}\n", report.duplicates));
    out.push_str(&format!("  Links discovered: {}\n", report.links_discovered));
    out.push_str(&format!("  Failed: {}\n\n", report.failures.len()));

    if !report.failures.is_empty() {
        out.push_str("Failures:\n");
        for failure in &report.failures {
            out.push_str(&format!("  - {}: {}\n", failure.url, failure.error));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} nodes)\n",
        report.success_rate(),
        report.succeeded(),
        report.visited
    ));

    out
}

/// Prints a report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}
