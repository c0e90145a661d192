use super::types::ConfigFile;
use super::*;
use crate::args::{EndpointArgs, RunArgs, StressArgs};
use crate::domain::{HttpMethod, PositiveU64, RedirectPolicy};
use std::time::Duration;
use tempfile::tempdir;

const TOML_CONFIG: &str = r#"
[run]
concurrency = 4
timeout = "2s"
retries = 1
backoff = "250ms"
headers = ["Accept: application/json"]
max_redirects = 2

[stress]
duration = "30s"
ramp_up = 5
rps = 20
max_concurrent = 8
think_time = "100ms"

[[endpoints]]
name = "create"
url = "http://localhost:8080/items"
method = "post"
body = '{"name":"x"}'
headers = ["Content-Type: application/json"]
timeout = "500ms"
expected_status = 201
expected_headers = { "content-type" = "application/json" }
expected_body = { id = 1 }

[[endpoints]]
url = "http://localhost:8080/health"
"#;

fn write_config(name: &str, content: &str) -> Result<(tempfile::TempDir, ConfigFile), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join(name);
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;
    let config = load_config_file(&path).map_err(|err| err.to_string())?;
    Ok((dir, config))
}

#[test]
fn parse_toml_config_sections() -> Result<(), String> {
    let (_dir, config) = write_config("webprobe.toml", TOML_CONFIG)?;
    let endpoints = endpoints_from(Some(&config), &EndpointArgs::default())
        .map_err(|err| err.to_string())?;
    let [create, health] = endpoints.as_slice() else {
        return Err(format!("Expected two endpoints, got {}", endpoints.len()));
    };
    if create.method != HttpMethod::Post || create.label() != "create" {
        return Err(format!("Unexpected endpoint {:?}", create));
    }
    if create.timeout() != Some(Duration::from_millis(500)) || create.expected_status != Some(201) {
        return Err(format!("Unexpected overrides {:?}", create));
    }
    if create.expected_body != Some(serde_json::json!({"id": 1})) {
        return Err(format!("Unexpected expected body {:?}", create.expected_body));
    }
    if create.headers.get("Content-Type").map(String::as_str) != Some("application/json") {
        return Err("Endpoint header missing".to_owned());
    }
    if health.method != HttpMethod::Get || health.label() != "http://localhost:8080/health" {
        return Err(format!("Unexpected endpoint {:?}", health));
    }

    let run = run_config_from(Some(&config), &RunArgs::default()).map_err(|err| err.to_string())?;
    if run.concurrency() != 4 || run.timeout() != Duration::from_secs(2) || run.retries() != 1 {
        return Err(format!("Unexpected run config {:?}", run));
    }
    if run.backoff_base() != Duration::from_millis(250) || run.redirect().max_redirects != 2 {
        return Err(format!("Unexpected run config {:?}", run));
    }

    let stress = stress_config_from(Some(&config), &StressArgs::default(), run)
        .map_err(|err| err.to_string())?;
    if stress.duration() != Duration::from_secs(30)
        || stress.ramp_up() != Duration::from_secs(5)
        || stress.target_rps() != 20
        || stress.max_concurrent() != 8
        || stress.think_time() != Duration::from_millis(100)
    {
        return Err(format!("Unexpected stress config {:?}", stress));
    }
    Ok(())
}

#[test]
fn parse_json_config() -> Result<(), String> {
    let content = r#"{
        "run": { "concurrency": 2, "follow_redirects": false },
        "endpoints": [
            { "url": "https://example.com", "method": "HEAD", "retries": 0 }
        ]
    }"#;
    let (_dir, config) = write_config("webprobe.json", content)?;
    let run = run_config_from(Some(&config), &RunArgs::default()).map_err(|err| err.to_string())?;
    if run.concurrency() != 2 || run.redirect() != RedirectPolicy::none() {
        return Err(format!("Unexpected run config {:?}", run));
    }
    let endpoints = endpoints_from(Some(&config), &EndpointArgs::default())
        .map_err(|err| err.to_string())?;
    let [endpoint] = endpoints.as_slice() else {
        return Err("Expected one endpoint".to_owned());
    };
    if endpoint.method != HttpMethod::Head || endpoint.retries != Some(0) {
        return Err(format!("Unexpected endpoint {:?}", endpoint));
    }
    Ok(())
}

#[test]
fn cli_flags_override_file_values() -> Result<(), String> {
    let (_dir, config) = write_config("webprobe.toml", TOML_CONFIG)?;
    let run_args = RunArgs {
        concurrency: Some(crate::domain::PositiveUsize::try_from(9).map_err(|err| err.to_string())?),
        timeout: Some(Duration::from_secs(7)),
        headers: vec![("Accept".to_owned(), "text/plain".to_owned())],
        no_redirects: true,
        ..RunArgs::default()
    };
    let run = run_config_from(Some(&config), &run_args).map_err(|err| err.to_string())?;
    if run.concurrency() != 9 || run.timeout() != Duration::from_secs(7) || run.retries() != 1 {
        return Err(format!("Unexpected merge {:?}", run));
    }
    if run.headers().get("Accept").map(String::as_str) != Some("text/plain") {
        return Err(format!("CLI header should win: {:?}", run.headers()));
    }
    if run.redirect().follow {
        return Err("--no-redirects should win".to_owned());
    }

    let stress_args = StressArgs {
        rps: Some(PositiveU64::try_from(3).map_err(|err| err.to_string())?),
        ..StressArgs::default()
    };
    let stress = stress_config_from(Some(&config), &stress_args, run).map_err(|err| err.to_string())?;
    if stress.target_rps() != 3 || stress.max_concurrent() != 8 {
        return Err(format!("Unexpected stress merge {:?}", stress));
    }

    let endpoint_args = EndpointArgs {
        url: vec!["http://localhost:9/extra".to_owned()],
        method: Some(HttpMethod::Put),
        data: Some("body".to_owned()),
        expect_status: Some(204),
    };
    let endpoints = endpoints_from(Some(&config), &endpoint_args).map_err(|err| err.to_string())?;
    let extra = endpoints.last().ok_or("Missing CLI endpoint")?;
    if endpoints.len() != 3 || extra.method != HttpMethod::Put || extra.expected_status != Some(204) {
        return Err(format!("Unexpected CLI endpoint {:?}", extra));
    }
    Ok(())
}

#[test]
fn missing_and_invalid_endpoints_are_rejected() -> Result<(), String> {
    if endpoints_from(None, &EndpointArgs::default()).is_ok() {
        return Err("Expected missing endpoints error".to_owned());
    }
    let args = EndpointArgs {
        url: vec!["ftp://localhost".to_owned()],
        ..EndpointArgs::default()
    };
    if endpoints_from(None, &args).is_ok() {
        return Err("Expected ftp URL to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn ramp_longer_than_duration_is_rejected() -> Result<(), String> {
    let content = "[stress]\nduration = \"5s\"\nramp_up = \"10s\"\n";
    let (_dir, config) = write_config("webprobe.toml", content)?;
    let result = stress_config_from(Some(&config), &StressArgs::default(), Default::default());
    if result.is_ok() {
        return Err("Expected ramp-up > duration to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn unsupported_extension_is_rejected() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("webprobe.yaml");
    std::fs::write(&path, "run: {}").map_err(|err| format!("write failed: {}", err))?;
    if load_config_file(&path).is_ok() {
        return Err("Expected yaml to be rejected".to_owned());
    }
    if load_config(Some("/definitely/missing/webprobe.toml")).is_ok() {
        return Err("Expected missing file to fail".to_owned());
    }
    Ok(())
}

#[test]
fn parse_duration_value_units() -> Result<(), String> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("3", Duration::from_secs(3)),
        ("3s", Duration::from_secs(3)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
        ("0", Duration::ZERO),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input).map_err(|err| err.to_string())?;
        if parsed != expected {
            return Err(format!("{} parsed as {:?}", input, parsed));
        }
    }
    for bad in ["", "ms", "5d", "99999999999999999999s"] {
        if parse_duration_value(bad).is_ok() {
            return Err(format!("Expected '{}' to fail", bad));
        }
    }
    Ok(())
}
