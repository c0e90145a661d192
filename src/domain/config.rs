use std::collections::BTreeMap;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use serde::Serialize;

use super::positive::{PositiveU64, PositiveUsize};
use crate::error::{ConfigError, ValidationError};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

const DEFAULT_STRESS_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_TARGET_RPS: u64 = 10;
const DEFAULT_MAX_CONCURRENT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_redirects: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl RedirectPolicy {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            follow: false,
            max_redirects: 0,
        }
    }
}

/// Settings shared read-only by every request of a run.
///
/// Built through [`RunConfig::builder`], which validates once; the executor
/// and runners never re-check these values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RunConfig {
    concurrency: PositiveUsize,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    timeout: Duration,
    retries: u32,
    #[serde(rename = "backoff_base_ms", serialize_with = "serialize_millis")]
    backoff_base: Duration,
    headers: BTreeMap<String, String>,
    redirect: RedirectPolicy,
}

impl RunConfig {
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    #[must_use]
    pub const fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub const fn redirect(&self) -> RedirectPolicy {
        self.redirect
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: PositiveUsize::try_from(DEFAULT_CONCURRENCY)
                .unwrap_or(PositiveUsize::MIN),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            headers: BTreeMap::new(),
            redirect: RedirectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    concurrency: usize,
    timeout: Duration,
    retries: u32,
    backoff_base: Duration,
    headers: Vec<(String, String)>,
    redirect: RedirectPolicy,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            headers: Vec::new(),
            redirect: RedirectPolicy::default(),
        }
    }
}

impl RunConfigBuilder {
    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub const fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub const fn redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    /// Validates the settings and freezes them into a [`RunConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error when concurrency is zero, the timeout is zero, or a
    /// default header is not a valid HTTP header.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let concurrency = PositiveUsize::try_from(self.concurrency).map_err(|err| {
            ConfigError::FieldMustBePositive {
                field: "concurrency",
                source: err,
            }
        })?;
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "timeout",
                source: ValidationError::DurationZero,
            });
        }

        let mut headers = BTreeMap::new();
        for (name, value) in self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| ConfigError::InvalidHeader {
                source: ValidationError::InvalidHeaderName {
                    header: name.clone(),
                    source: err,
                },
            })?;
            HeaderValue::from_str(&value).map_err(|err| ConfigError::InvalidHeader {
                source: ValidationError::InvalidHeaderValue {
                    header: name.clone(),
                    source: err,
                },
            })?;
            headers.insert(name, value);
        }

        Ok(RunConfig {
            concurrency,
            timeout: self.timeout,
            retries: self.retries,
            backoff_base: self.backoff_base,
            headers,
            redirect: self.redirect,
        })
    }
}

/// Sustained-load settings layered on top of a [`RunConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StressConfig {
    run: RunConfig,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    duration: Duration,
    #[serde(rename = "ramp_up_ms", serialize_with = "serialize_millis")]
    ramp_up: Duration,
    target_rps: PositiveU64,
    max_concurrent: PositiveUsize,
    #[serde(rename = "think_time_ms", serialize_with = "serialize_millis")]
    think_time: Duration,
}

impl StressConfig {
    #[must_use]
    pub fn builder(run: RunConfig) -> StressConfigBuilder {
        StressConfigBuilder {
            run,
            duration: DEFAULT_STRESS_DURATION,
            ramp_up: Duration::ZERO,
            target_rps: DEFAULT_TARGET_RPS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            think_time: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn run(&self) -> &RunConfig {
        &self.run
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn ramp_up(&self) -> Duration {
        self.ramp_up
    }

    #[must_use]
    pub const fn target_rps(&self) -> u64 {
        self.target_rps.get()
    }

    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent.get()
    }

    #[must_use]
    pub const fn think_time(&self) -> Duration {
        self.think_time
    }
}

#[derive(Debug, Clone)]
pub struct StressConfigBuilder {
    run: RunConfig,
    duration: Duration,
    ramp_up: Duration,
    target_rps: u64,
    max_concurrent: usize,
    think_time: Duration,
}

impl StressConfigBuilder {
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub const fn ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up = ramp_up;
        self
    }

    #[must_use]
    pub const fn target_rps(mut self, target_rps: u64) -> Self {
        self.target_rps = target_rps;
        self
    }

    #[must_use]
    pub const fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    #[must_use]
    pub const fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Validates the stress settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the duration is zero, the target rate or the
    /// in-flight ceiling is zero, or ramp-up is longer than the duration.
    pub fn build(self) -> Result<StressConfig, ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "duration",
                source: ValidationError::DurationZero,
            });
        }
        let target_rps = PositiveU64::try_from(self.target_rps).map_err(|err| {
            ConfigError::FieldMustBePositive {
                field: "target_rps",
                source: err,
            }
        })?;
        let max_concurrent = PositiveUsize::try_from(self.max_concurrent).map_err(|err| {
            ConfigError::FieldMustBePositive {
                field: "max_concurrent",
                source: err,
            }
        })?;
        if self.ramp_up > self.duration {
            return Err(ConfigError::InvalidStress {
                source: ValidationError::RampUpExceedsDuration {
                    ramp_up_ms: self.ramp_up.as_millis(),
                    duration_ms: self.duration.as_millis(),
                },
            });
        }

        Ok(StressConfig {
            run: self.run,
            duration: self.duration,
            ramp_up: self.ramp_up,
            target_rps,
            max_concurrent,
            think_time: self.think_time,
        })
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}
