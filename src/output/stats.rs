//! Statistics reporting.

use console::style;

use crate::download::{AccountReport, RunReport};

/// Print the walk result for a single account.
pub fn print_account_stats(report: &AccountReport) {
    match (&report.summary, &report.error) {
        (_, Some(error)) => println!(
            "  {} {}",
            style(&report.account).red().bold(),
            style(format!("failed: {}", error)).red()
        ),
        (Some(summary), None) => println!(
            "  {} {} page(s), {} entries, {} item(s) queued, {} dropped",
            style(&report.account).bold(),
            summary.pages,
            summary.entries,
            summary.items_queued,
            summary.entries_dropped
        ),
        (None, None) => println!("  {} {}", style(&report.account).bold(), style("cancelled").yellow()),
    }
}

/// Print statistics for the whole run.
pub fn print_run_stats(report: &RunReport) {
    let stats = &report.stats;

    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Accounts:").bold());
    for account in &report.accounts {
        print_account_stats(account);
    }

    println!();
    println!("{}", style("Run Statistics:").bold());
    println!("  Pictures: {}", stats.pic_count);
    println!("  Videos:   {}", stats.vid_count);
    println!("  Skipped:  {} (already present)", stats.already_present);
    if stats.total_missing() > 0 {
        println!(
            "  Missing:  {} ({} failed, {} dropped, {} rate limited)",
            style(stats.total_missing()).red(),
            stats.download_failures,
            stats.dropped_items,
            stats.lost_to_rate_limit
        );
    }
    if report.rate_limit_events > 0 {
        println!(
            "  Rate limits hit: {}",
            style(report.rate_limit_events).yellow()
        );
    }
    let failed = report.failed_accounts();
    if failed > 0 {
        println!("  Accounts failed: {}", style(failed).red());
    }
    println!("  Total:    {} downloaded", stats.total_downloaded());
    println!("{}", style("═".repeat(50)).dim());
}
