use super::test_support::parse_test_args;
use super::*;
use crate::domain::HttpMethod;
use crate::error::{AppError, AppResult};
use std::time::Duration;

#[test]
fn check_collects_urls_and_run_flags() -> AppResult<()> {
    let args = parse_test_args([
        "webprobe",
        "check",
        "--url",
        "http://localhost/a",
        "-u",
        "http://localhost/b",
        "-X",
        "POST",
        "-d",
        "{}",
        "--expect-status",
        "201",
        "-n",
        "4",
        "--timeout",
        "500ms",
        "-H",
        "Accept: application/json",
        "--no-redirects",
        "--format",
        "summary",
    ])?;
    let Command::Check(request) = args.command else {
        return Err(AppError::validation("Expected check subcommand"));
    };
    if request.endpoint.url.len() != 2 || request.endpoint.method != Some(HttpMethod::Post) {
        return Err(AppError::validation("Unexpected endpoint args"));
    }
    if request.endpoint.expect_status != Some(201) || request.endpoint.data.as_deref() != Some("{}")
    {
        return Err(AppError::validation("Unexpected expectations"));
    }
    if request.run.concurrency.map(|value| value.get()) != Some(4)
        || request.run.timeout != Some(Duration::from_millis(500))
        || !request.run.no_redirects
    {
        return Err(AppError::validation("Unexpected run args"));
    }
    if request.run.headers != [("Accept".to_owned(), "application/json".to_owned())] {
        return Err(AppError::validation("Unexpected headers"));
    }
    if args.format != OutputFormat::Summary {
        return Err(AppError::validation("Unexpected format"));
    }
    Ok(())
}

#[test]
fn stress_parses_rate_shape() -> AppResult<()> {
    let args = parse_test_args([
        "webprobe",
        "stress",
        "-u",
        "http://localhost",
        "--duration",
        "2m",
        "--ramp-up",
        "10s",
        "--rps",
        "50",
        "--max-concurrent",
        "20",
        "--think-time",
        "0",
    ])?;
    let Command::Stress(stress) = args.command else {
        return Err(AppError::validation("Expected stress subcommand"));
    };
    if stress.duration != Some(Duration::from_secs(120))
        || stress.ramp_up != Some(Duration::from_secs(10))
        || stress.think_time != Some(Duration::ZERO)
    {
        return Err(AppError::validation("Unexpected durations"));
    }
    if stress.rps.map(|value| value.get()) != Some(50)
        || stress.max_concurrent.map(|value| value.get()) != Some(20)
    {
        return Err(AppError::validation("Unexpected rate args"));
    }
    Ok(())
}

#[test]
fn rejects_zero_rps_and_bad_headers() -> AppResult<()> {
    if parse_test_args(["webprobe", "stress", "--rps", "0"]).is_ok() {
        return Err(AppError::validation("Expected --rps 0 to fail"));
    }
    if parse_test_args(["webprobe", "check", "-H", "no-colon"]).is_ok() {
        return Err(AppError::validation("Expected bad header to fail"));
    }
    if parse_test_args(["webprobe", "connectivity"]).is_ok() {
        return Err(AppError::validation("Connectivity needs URLs"));
    }
    Ok(())
}

#[test]
fn global_flags_follow_subcommand() -> AppResult<()> {
    let args = parse_test_args([
        "webprobe",
        "connectivity",
        "http://a.test",
        "http://b.test",
        "--config",
        "probe.toml",
        "-o",
        "out.json",
        "-v",
    ])?;
    let Command::Connectivity(connectivity) = args.command else {
        return Err(AppError::validation("Expected connectivity"));
    };
    if connectivity.urls.len() != 2
        || args.config.as_deref() != Some("probe.toml")
        || args.output.as_deref() != Some("out.json")
        || !args.verbose
    {
        return Err(AppError::validation("Unexpected global flags"));
    }
    Ok(())
}

#[test]
fn parse_header_trims_and_requires_name() -> Result<(), String> {
    let (name, value) = parse_header("X-Key:  a:b ").map_err(|err| err.to_string())?;
    if name != "X-Key" || value != "a:b" {
        return Err(format!("Unexpected header {}={}", name, value));
    }
    if parse_header(": value").is_ok() {
        return Err("Empty header name should fail".to_owned());
    }
    Ok(())
}
