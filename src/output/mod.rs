//! Output module for crawl reports
//!
//! This module handles:
//! - Tallying per-crawl counts and node failures
//! - Printing the final report to stdout
//! - Writing a markdown version of the report

mod markdown;
mod report;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use report::{format_report, print_report, CrawlReport, NodeFailure};
