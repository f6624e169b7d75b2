//! CLI output formatting for publish runs.
//!
//! The run report is the operator's record of what happened: failed objects
//! first, each with its last error and how many attempts it got, then a
//! one-line summary. Format functions are pure (return `Vec<String>`, no
//! I/O) so tests can assert on them directly; `print_*` wrappers write to
//! stdout.

use crate::upload::PublishReport;

/// Render the run report, failures first, summary last.
pub fn format_publish_report(report: &PublishReport) -> Vec<String> {
    let mut lines = Vec::new();

    for failure in report.failures() {
        let error = failure
            .result
            .as_ref()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        lines.push(format!(
            "FAILED {} ({} attempts): {}",
            failure.destination_key, failure.attempts, error
        ));
    }

    let uploaded = report.outcomes.iter().filter(|o| o.is_success()).count();
    let failed = report.outcomes.len() - uploaded;
    let summary = if failed == 0 {
        format!(
            "Published {} objects ({} bytes)",
            uploaded,
            report.bytes_transmitted()
        )
    } else {
        format!(
            "Published {} objects ({} bytes), {} failed",
            uploaded,
            report.bytes_transmitted(),
            failed
        )
    };
    lines.push(summary);

    lines
}

pub fn print_publish_report(report: &PublishReport) {
    for line in format_publish_report(report) {
        println!("{line}");
    }
}
