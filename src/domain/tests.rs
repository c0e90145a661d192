use super::*;
use std::time::Duration;

#[test]
fn run_config_defaults_are_documented_values() -> Result<(), String> {
    let config = RunConfig::builder()
        .build()
        .map_err(|err| format!("default build failed: {}", err))?;
    if config.concurrency() != DEFAULT_CONCURRENCY {
        return Err(format!("Unexpected concurrency {}", config.concurrency()));
    }
    if config.timeout() != DEFAULT_TIMEOUT || config.retries() != DEFAULT_RETRIES {
        return Err("Unexpected timeout/retries defaults".to_owned());
    }
    if config.redirect() != RedirectPolicy::default() {
        return Err("Unexpected redirect default".to_owned());
    }
    if config != RunConfig::default() {
        return Err("Builder defaults should match RunConfig::default".to_owned());
    }
    Ok(())
}

#[test]
fn run_config_rejects_zero_concurrency() -> Result<(), String> {
    if RunConfig::builder().concurrency(0).build().is_ok() {
        return Err("Expected zero concurrency to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn run_config_rejects_invalid_header_name() -> Result<(), String> {
    if RunConfig::builder()
        .header("bad header", "value")
        .build()
        .is_ok()
    {
        return Err("Expected invalid header name to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn stress_config_rejects_ramp_longer_than_duration() -> Result<(), String> {
    let result = StressConfig::builder(RunConfig::default())
        .duration(Duration::from_secs(2))
        .ramp_up(Duration::from_secs(3))
        .build();
    if result.is_ok() {
        return Err("Expected ramp-up > duration to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn stress_config_rejects_zero_rps() -> Result<(), String> {
    let result = StressConfig::builder(RunConfig::default())
        .target_rps(0)
        .build();
    if result.is_ok() {
        return Err("Expected zero target_rps to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn endpoint_label_prefers_name() -> Result<(), String> {
    let anonymous = Endpoint::get("http://localhost/a");
    if anonymous.label() != "http://localhost/a" {
        return Err(format!("Unexpected label {}", anonymous.label()));
    }
    let named = anonymous.named("home");
    if named.label() != "home" {
        return Err(format!("Unexpected label {}", named.label()));
    }
    Ok(())
}

#[test]
fn endpoint_validate_rejects_non_http_schemes() -> Result<(), String> {
    if Endpoint::get("ftp://example.com").validate().is_ok() {
        return Err("Expected ftp scheme to be rejected".to_owned());
    }
    if Endpoint::get("not a url").validate().is_ok() {
        return Err("Expected garbage URL to be rejected".to_owned());
    }
    Endpoint::get("https://example.com/health")
        .validate()
        .map_err(|err| format!("Expected https URL to pass: {}", err))
}

#[test]
fn http_method_parses_case_insensitively() -> Result<(), String> {
    let method: HttpMethod = "patch"
        .parse()
        .map_err(|err| format!("parse failed: {}", err))?;
    if method != HttpMethod::Patch || !method.allows_body() {
        return Err("Expected PATCH with body support".to_owned());
    }
    if HttpMethod::Get.allows_body() {
        return Err("GET must not carry a body".to_owned());
    }
    Ok(())
}

#[test]
fn endpoint_deserializes_lowercase_method() -> Result<(), String> {
    let endpoint: Endpoint = serde_json::from_str(
        r#"{"url":"http://localhost","method":"post","expected_status":201}"#,
    )
    .map_err(|err| format!("deserialize failed: {}", err))?;
    if endpoint.method != HttpMethod::Post || endpoint.expected_status != Some(201) {
        return Err(format!("Unexpected endpoint {:?}", endpoint));
    }
    Ok(())
}

#[test]
fn severity_follows_category_table() -> Result<(), String> {
    let cases = [
        (ErrorCategory::Timeout, Severity::Critical),
        (ErrorCategory::ServerError, Severity::Critical),
        (ErrorCategory::Connection, Severity::Critical),
        (ErrorCategory::Ssl, Severity::High),
        (ErrorCategory::Dns, Severity::High),
        (ErrorCategory::NotFound, Severity::Medium),
        (ErrorCategory::Forbidden, Severity::Medium),
        (ErrorCategory::BadRequest, Severity::Low),
        (ErrorCategory::Unknown, Severity::Low),
    ];
    for (category, expected) in cases {
        if category.severity() != expected {
            return Err(format!("{:?} mapped to {:?}", category, category.severity()));
        }
    }
    Ok(())
}

#[test]
fn speed_grade_buckets() -> Result<(), String> {
    let cases = [
        (50.0, SpeedGrade::Fastest),
        (100.0, SpeedGrade::Fast),
        (750.0, SpeedGrade::Moderate),
        (1999.0, SpeedGrade::Normal),
        (4000.0, SpeedGrade::Slow),
        (5000.0, SpeedGrade::VerySlow),
    ];
    for (average, expected) in cases {
        let grade = SpeedGrade::from_average_ms(average);
        if grade != expected {
            return Err(format!("{} graded {:?}", average, grade));
        }
    }
    Ok(())
}
