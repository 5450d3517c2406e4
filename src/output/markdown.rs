//! Markdown report generation
//!
//! This module writes a human-readable markdown version of a crawl report,
//! including node counts and the list of failed nodes.

use crate::output::report::CrawlReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Failures listed individually before the rest are summarized
const MAX_LISTED_FAILURES: usize = 50;

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `config_hash` - Hash of the configuration file, if one was used
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(
    report: &CrawlReport,
    config_hash: Option<&str>,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport, config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Spider Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Root**: {}\n", report.root));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        report.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Max Depth**: {}\n", report.max_depth));
    md.push_str(&format!("- **Concurrency**: {}\n", report.concurrency));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Node Breakdown\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Visited | {} |\n", report.visited));
    md.push_str(&format!("| Fetched | {} |\n", report.fetched));
    md.push_str(&format!("| Cache Hit | {} |\n", report.cache_hits));
    md.push_str(&format!("| Duplicate | {} |\n", report.duplicates));
    md.push_str(&format!("| Failed | {} |\n\n", report.failures.len()));
    md.push_str(&format!(
        "- **Links Discovered**: {}\n",
        report.links_discovered
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.failures.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| URL | Depth | Error |\n");
        md.push_str("|-----|-------|-------|\n");

        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                table_cell(&failure.url),
                failure.depth,
                table_cell(&failure.error)
            ));
        }

        if report.failures.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    md
}

/// Keeps a value inside a single markdown table cell
fn table_cell(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}
