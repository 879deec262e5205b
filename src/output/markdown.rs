//! Markdown crawl summary generation
//!
//! This module renders a `CrawlReport` as a human-readable markdown
//! document: run information, page state breakdown, depth breakdown and a
//! per-page table.

use crate::crawler::CrawlReport;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a crawl to `output_path`
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(std::io::Error)` - Failed to write summary
pub fn write_crawl_summary(report: &CrawlReport, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_crawl_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_crawl_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Crawled At**: {}\n", report.crawled_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Limits**: depth {}, {} pages\n",
        report.max_depth, report.max_pages
    ));
    md.push_str(&format!(
        "- **Status**: {}\n\n",
        match (report.success, report.cancelled) {
            (_, true) => "cancelled",
            (true, false) => "completed",
            (false, false) => "failed",
        }
    ));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Crawled**: {}\n", report.pages_crawled));
    md.push_str(&format!("- **Pages Failed**: {}\n", report.pages_failed));
    md.push_str(&format!("- **Deepest Level Reached**: {}\n", report.deepest()));
    let success_rate = if report.pages_crawled > 0 {
        (report.pages_crawled - report.pages_failed) as f64 / report.pages_crawled as f64 * 100.0
    } else {
        0.0
    };
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", success_rate));

    // State breakdown
    let counts = report.state_counts();
    if !counts.is_empty() {
        md.push_str("## Page State Breakdown\n\n");
        md.push_str("| State | Count |\n");
        md.push_str("|-------|-------|\n");
        for (state, count) in counts {
            md.push_str(&format!("| {} | {} |\n", state, count));
        }
        md.push('\n');
    }

    // Depth breakdown
    let mut depths: BTreeMap<u32, usize> = BTreeMap::new();
    for record in &report.results {
        *depths.entry(record.depth).or_insert(0) += 1;
    }
    if !depths.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Pages
    if !report.results.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| # | Depth | URL | Status | Title / Error | Resource |\n");
        md.push_str("|---|-------|-----|--------|---------------|----------|\n");
        for (i, record) in report.results.iter().enumerate() {
            let status = record
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| record.state.to_string());
            let detail = if record.success {
                record.title.clone().unwrap_or_default()
            } else {
                record.error.clone().unwrap_or_default()
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                i + 1,
                record.depth,
                record.url,
                status,
                escape_cell(&detail),
                record.resource_uri.as_deref().unwrap_or("-")
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}
