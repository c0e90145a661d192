use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::HttpMethod;
use crate::error::ValidationError;

/// On-disk configuration (`webprobe.toml` / `webprobe.json`).
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub run: Option<RunSection>,
    pub stress: Option<StressSection>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunSection {
    pub concurrency: Option<usize>,
    pub timeout: Option<DurationValue>,
    pub retries: Option<u32>,
    #[serde(alias = "backoff_base")]
    pub backoff: Option<DurationValue>,
    /// `"Key: Value"` strings.
    pub headers: Option<Vec<String>>,
    pub follow_redirects: Option<bool>,
    pub max_redirects: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StressSection {
    pub duration: Option<DurationValue>,
    pub ramp_up: Option<DurationValue>,
    #[serde(alias = "rps")]
    pub target_rps: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub think_time: Option<DurationValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointConfig {
    pub name: Option<String>,
    pub url: String,
    pub method: Option<HttpMethod>,
    pub headers: Option<Vec<String>>,
    pub body: Option<String>,
    pub timeout: Option<DurationValue>,
    pub retries: Option<u32>,
    pub expected_status: Option<u16>,
    pub expected_headers: Option<BTreeMap<String, String>>,
    pub expected_body: Option<Value>,
}

/// A bare number of seconds or a string with a unit suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }
}
