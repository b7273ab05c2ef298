//! Output formatting for CLI

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use plumbline_client::health::{EndpointResult, HealthReport};
use plumbline_client::HealthStatus;
use plumbline_e2e::report::{format_duration, RunStats};
use plumbline_e2e::CleanupStats;

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print the scenario totals of a finished run
pub fn print_run_summary(stats: &RunStats) {
    let s = &stats.scenarios;
    let mut table = table();
    table.set_header(vec!["Features", "Scenarios", "Passed", "Failed", "Skipped", "Success", "Duration"]);
    table.add_row(vec![
        Cell::new(stats.features),
        Cell::new(s.total),
        Cell::new(s.passed).fg(Color::Green),
        Cell::new(s.failed).fg(if s.failed > 0 { Color::Red } else { Color::Reset }),
        Cell::new(s.skipped).fg(if s.skipped > 0 { Color::Yellow } else { Color::Reset }),
        Cell::new(format!("{}%", stats.success_rate)),
        Cell::new(format_duration(stats.duration)),
    ]);

    println!();
    println!("{}", "📊 Test Results Summary".bold());
    println!("{table}");
}

fn endpoint_row(result: &EndpointResult) -> Vec<Cell> {
    let (mark, color) = if result.is_healthy() {
        ("✓", Color::Green)
    } else {
        ("✗", Color::Red)
    };
    let detail = match &result.error {
        Some(err) => err.clone(),
        None => result
            .failed_checks()
            .map(|c| format!("{}: expected {}, got {}", c.name, c.expected, c.actual))
            .collect::<Vec<_>>()
            .join("; "),
    };
    vec![
        Cell::new(mark).fg(color),
        Cell::new(&result.endpoint),
        Cell::new(
            result
                .http_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
        ),
        Cell::new(format!("{}ms", result.response_time)),
        Cell::new(result.attempts),
        Cell::new(detail),
    ]
}

/// Print a health report as a headline plus a per-endpoint table
pub fn print_health_report(report: &HealthReport) {
    let headline = format!(
        "{} {} ({}/{} endpoints healthy, {}%)",
        report.status.emoji(),
        report.status.to_string().to_uppercase(),
        report.summary.healthy,
        report.summary.total,
        report.summary.health_percentage
    );
    let headline = match report.status {
        HealthStatus::Healthy => headline.green(),
        HealthStatus::Degraded => headline.yellow(),
        HealthStatus::Unhealthy => headline.red(),
    };
    println!("{}", headline.bold());
    println!("   {} · {}ms", report.base_url, report.duration);

    if let Some(err) = &report.error {
        print_error(err);
    }
    if report.results.is_empty() {
        return;
    }

    let mut table = table();
    table.set_header(vec!["", "Endpoint", "Status", "Time", "Attempts", "Details"]);
    for result in &report.results {
        table.add_row(endpoint_row(result));
    }
    println!("{table}");
}

/// Print what a cleanup removed, or would remove on a dry run
pub fn print_cleanup(stats: &CleanupStats, dry_run: bool) {
    let verb = if dry_run { "Would remove" } else { "Removed" };
    for path in &stats.removed {
        println!("   {} {}", verb.dimmed(), path.display());
    }

    let mut table = table();
    table.set_header(vec!["Directories", "Files", "Freed", "Errors"]);
    table.add_row(vec![
        Cell::new(stats.directories_processed),
        Cell::new(stats.files_deleted),
        Cell::new(plumbline_e2e::cleanup::format_bytes(stats.bytes_freed)),
        Cell::new(stats.errors.len()).fg(if stats.errors.is_empty() { Color::Reset } else { Color::Red }),
    ]);
    println!("{table}");

    for err in &stats.errors {
        print_warning(err);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
