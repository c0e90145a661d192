use crate::domain::{BatchReport, ErrorBucket, StressReport, TestResult};

use super::Report;

pub(super) fn summary_lines(report: &Report) -> Vec<String> {
    match report {
        Report::Batch(report) => batch_lines(report),
        Report::Stress(report) => stress_lines(report),
        Report::Single(result) => vec![result_line(result)],
    }
}

fn batch_lines(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "Batch: {} tests, {} passed, {} failed in {}ms",
        report.total_tests, report.successful_tests, report.failed_tests, report.duration_ms
    ));
    lines.push(format!(
        "Success rate: {:.1}% ({:?})",
        report.summary.success_rate, report.summary.speed_grade
    ));
    lines.push(format!(
        "Response time: avg {:.1}ms, min {}ms, max {}ms",
        report.average_response_time_ms,
        report.min_response_time_ms,
        report.max_response_time_ms
    ));
    lines.push(format!("Data received: {} bytes", report.total_data_bytes));
    lines.extend(report.results.iter().map(result_line));
    lines.extend(error_lines(&report.errors));
    lines
}

fn stress_lines(report: &StressReport) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "Stress {}: {:?} after {}ms",
        report.run_id, report.state, report.duration_ms
    ));
    lines.push(format!(
        "Requests: {} total, {} passed, {} failed, {} cancelled, {} throttled",
        report.total_requests,
        report.successful_requests,
        report.failed_requests,
        report.cancelled_requests,
        report.throttled_requests
    ));
    lines.push(format!(
        "Throughput: avg {:.2} rps, peak {:.2} rps",
        report.average_rps, report.peak_rps
    ));
    lines.push(format!(
        "Latency: avg {:.1}ms, min {}ms, max {}ms",
        report.average_response_time_ms, report.min_response_time_ms, report.max_response_time_ms
    ));
    let p = report.percentiles;
    lines.push(format!(
        "Percentiles: p50 {}ms, p90 {}ms, p95 {}ms, p99 {}ms",
        p.p50, p.p90, p.p95, p.p99
    ));
    lines.extend(error_lines(&report.errors));
    lines
}

fn result_line(result: &TestResult) -> String {
    let verdict = if result.success { "PASS" } else { "FAIL" };
    let retries = if result.retries > 0 {
        format!(" ({} retries)", result.retries)
    } else {
        String::new()
    };
    let error = result
        .error
        .as_deref()
        .map(|error| format!(": {}", error))
        .unwrap_or_default();
    format!(
        "{} {} {} -> {} in {}ms{}{}",
        verdict,
        result.endpoint.method,
        result.endpoint.label(),
        result.status,
        result.response_time_ms,
        retries,
        error
    )
}

fn error_lines(errors: &[ErrorBucket]) -> Vec<String> {
    errors
        .iter()
        .map(|bucket| {
            format!(
                "Errors [{}]: {} ({:.1}%, {:?})",
                bucket.category.as_str(),
                bucket.count,
                bucket.percentage,
                bucket.severity
            )
        })
        .collect()
}
