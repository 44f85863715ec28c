//! End-of-run report printing

use crate::crawler::CrawlReport;
use crate::state::StatsSnapshot;

/// Share of fetched pages that matched, as a percentage
pub fn match_rate(stats: &StatsSnapshot) -> f64 {
    if stats.pages_fetched > 0 {
        (stats.pages_matched as f64 / stats.pages_fetched as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints the crawl report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Stopped: {}", report.stop_reason.as_str());
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!();

    print_snapshot(&report.stats);

    if let Some(export) = &report.export {
        println!("Output Files ({}):", export.files.len());
        for file in &export.files {
            println!("  - {}", file.display());
        }
        println!();
    }
}

/// Prints the counters alone, used when a crawl fails before producing a report
pub fn print_snapshot(stats: &StatsSnapshot) {
    println!("Pages:");
    println!("  Dispatched: {}", stats.pages_dispatched);
    println!("  Fetched: {}", stats.pages_fetched);
    println!("  Matched: {}", stats.pages_matched);
    println!("  Exported: {}", stats.pages_exported);
    println!("  Errors: {}", stats.errors);
    println!();

    println!(
        "Match Rate: {:.1}% ({} / {} fetched pages matched)",
        match_rate(stats),
        stats.pages_matched,
        stats.pages_fetched
    );
}
