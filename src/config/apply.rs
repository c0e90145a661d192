use std::time::Duration;

use crate::args::{EndpointArgs, RunArgs, StressArgs, parse_header};
use crate::domain::{
    DEFAULT_MAX_REDIRECTS, Endpoint, RedirectPolicy, RunConfig, StressConfig, StressConfigBuilder,
};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue, EndpointConfig};

/// Merges the `[run]` section with CLI flags; flags win.
///
/// # Errors
///
/// Returns an error for unparseable durations or headers, or when the merged
/// settings fail validation.
pub fn run_config_from(file: Option<&ConfigFile>, args: &RunArgs) -> AppResult<RunConfig> {
    let section = file.and_then(|config| config.run.as_ref());
    let mut builder = RunConfig::builder();

    if let Some(concurrency) = args
        .concurrency
        .map(|value| value.get())
        .or_else(|| section.and_then(|s| s.concurrency))
    {
        builder = builder.concurrency(concurrency);
    }
    if let Some(timeout) = pick_duration(
        args.timeout,
        section.and_then(|s| s.timeout.as_ref()),
        "timeout",
    )? {
        builder = builder.timeout(timeout);
    }
    if let Some(retries) = args
        .retries
        .or_else(|| section.and_then(|s| s.retries))
    {
        builder = builder.retries(retries);
    }
    if let Some(backoff) = pick_duration(
        args.backoff,
        section.and_then(|s| s.backoff.as_ref()),
        "backoff",
    )? {
        builder = builder.backoff_base(backoff);
    }

    if let Some(headers) = section.and_then(|s| s.headers.as_ref()) {
        builder = builder.headers(parse_headers(headers)?);
    }
    builder = builder.headers(args.headers.iter().cloned());

    let follow = !args.no_redirects
        && section
            .and_then(|s| s.follow_redirects)
            .unwrap_or(true);
    let max_redirects = args
        .max_redirects
        .or_else(|| section.and_then(|s| s.max_redirects))
        .unwrap_or(DEFAULT_MAX_REDIRECTS);
    builder = builder.redirect(if follow {
        RedirectPolicy {
            follow,
            max_redirects,
        }
    } else {
        RedirectPolicy::none()
    });

    Ok(builder.build()?)
}

/// Endpoints from `[[endpoints]]` followed by the `--url` flags.
///
/// # Errors
///
/// Returns an error when an endpoint is malformed or no endpoint is left.
pub fn endpoints_from(file: Option<&ConfigFile>, args: &EndpointArgs) -> AppResult<Vec<Endpoint>> {
    let mut endpoints = Vec::new();
    if let Some(file) = file {
        for (index, config) in file.endpoints.iter().enumerate() {
            endpoints.push(endpoint_from_config(index, config)?);
        }
    }

    for url in &args.url {
        let mut endpoint = Endpoint::new(args.method.unwrap_or_default(), url.clone());
        endpoint.body = args.data.clone();
        endpoint.expected_status = args.expect_status;
        endpoints.push(endpoint);
    }

    for (index, endpoint) in endpoints.iter().enumerate() {
        endpoint
            .validate()
            .map_err(|err| ConfigError::InvalidEndpoint { index, source: err })?;
    }
    if endpoints.is_empty() {
        return Err(AppError::validation(ValidationError::MissingEndpoints));
    }
    Ok(endpoints)
}

/// Merges the `[stress]` section with CLI flags on top of `run`.
///
/// # Errors
///
/// Returns an error for unparseable durations or invalid stress settings.
pub fn stress_config_from(
    file: Option<&ConfigFile>,
    args: &StressArgs,
    run: RunConfig,
) -> AppResult<StressConfig> {
    let section = file.and_then(|config| config.stress.as_ref());
    let mut builder: StressConfigBuilder = StressConfig::builder(run);

    if let Some(duration) = pick_duration(
        args.duration,
        section.and_then(|s| s.duration.as_ref()),
        "duration",
    )? {
        builder = builder.duration(duration);
    }
    if let Some(ramp_up) = pick_duration(
        args.ramp_up,
        section.and_then(|s| s.ramp_up.as_ref()),
        "ramp_up",
    )? {
        builder = builder.ramp_up(ramp_up);
    }
    if let Some(rps) = args
        .rps
        .map(|value| value.get())
        .or_else(|| section.and_then(|s| s.target_rps))
    {
        builder = builder.target_rps(rps);
    }
    if let Some(max_concurrent) = args
        .max_concurrent
        .map(|value| value.get())
        .or_else(|| section.and_then(|s| s.max_concurrent))
    {
        builder = builder.max_concurrent(max_concurrent);
    }
    if let Some(think_time) = pick_duration(
        args.think_time,
        section.and_then(|s| s.think_time.as_ref()),
        "think_time",
    )? {
        builder = builder.think_time(think_time);
    }

    Ok(builder.build()?)
}

fn endpoint_from_config(index: usize, config: &EndpointConfig) -> AppResult<Endpoint> {
    let mut endpoint = Endpoint::new(config.method.unwrap_or_default(), config.url.clone());
    endpoint.name = config.name.clone();
    if let Some(headers) = config.headers.as_ref() {
        endpoint.headers.extend(parse_headers(headers)?);
    }
    endpoint.body = config.body.clone();
    if let Some(timeout) = config.timeout.as_ref() {
        let timeout = timeout
            .to_duration()
            .map_err(|err| ConfigError::InvalidEndpoint { index, source: err })?;
        if timeout.is_zero() {
            return Err(AppError::config(ConfigError::InvalidEndpoint {
                index,
                source: ValidationError::DurationZero,
            }));
        }
        endpoint = endpoint.with_timeout(timeout);
    }
    endpoint.retries = config.retries;
    endpoint.expected_status = config.expected_status;
    if let Some(expected) = config.expected_headers.as_ref() {
        endpoint.expected_headers = expected.clone();
    }
    endpoint.expected_body = config.expected_body.clone();
    Ok(endpoint)
}

fn pick_duration(
    flag: Option<Duration>,
    file: Option<&DurationValue>,
    field: &'static str,
) -> AppResult<Option<Duration>> {
    if flag.is_some() {
        return Ok(flag);
    }
    file.map(|value| {
        value
            .to_duration()
            .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
    })
    .transpose()
}

fn parse_headers(headers: &[String]) -> AppResult<Vec<(String, String)>> {
    let mut parsed = Vec::with_capacity(headers.len());
    for header in headers {
        parsed.push(
            parse_header(header)
                .map_err(|err| AppError::config(ConfigError::InvalidHeader { source: err }))?,
        );
    }
    Ok(parsed)
}
